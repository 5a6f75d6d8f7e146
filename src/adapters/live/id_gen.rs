//! Live adapter for the `IdGenerator` port.

use uuid::Uuid;

use crate::ports::IdGenerator;

/// Live ID generator that produces random UUIDs in simple (hex-only) form.
pub struct LiveIdGenerator;

impl LiveIdGenerator {
    /// Creates a new live ID generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for LiveIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_unique_hex_ids() {
        let gen = LiveIdGenerator::new();
        let id1 = gen.generate_id();
        let id2 = gen.generate_id();

        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 32);
        assert!(id1.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
