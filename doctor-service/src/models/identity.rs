/// Role string carried by tokens issued to doctors.
pub const DOCTOR_ROLE: &str = "doctor";

/// The authenticated caller, attached to the request by the authentication
/// gate. Handlers treat it as read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Subject identifier (`sub` claim). For doctors this is the doctor id
    /// appointments are keyed on.
    pub subject: String,
    pub role: String,
    pub email: Option<String>,
    /// Token id (`jti` claim), when the issuer provides one.
    pub token_id: Option<String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
            email: None,
            token_id: None,
        }
    }

    /// Capabilities granted to this identity. A token carries a single role,
    /// so the set has one element.
    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.role.as_str())
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities().any(|granted| granted == capability)
    }
}
