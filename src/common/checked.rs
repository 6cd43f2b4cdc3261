/// Outcome of checking a signature-bearing record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Integrity {
    Verified,
    Unverified,
}

/// A decoded record together with whether its signature held up.
///
/// Unverified records are still returned so callers can inspect or print
/// them; deciding whether to trust one is left to the caller.
#[derive(Clone, Debug)]
pub struct Checked<T> {
    pub value: T,
    pub integrity: Integrity,
}

impl<T> Checked<T> {
    pub fn new(value: T, verified: bool) -> Self {
        let integrity = if verified {
            Integrity::Verified
        } else {
            Integrity::Unverified
        };
        Checked { value, integrity }
    }

    pub fn is_verified(&self) -> bool {
        self.integrity == Integrity::Verified
    }
}
