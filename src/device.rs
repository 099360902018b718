//! Device classification for source deduplication
//!
//! When a wrist device and a phone both record an additive metric (steps,
//! energy) for the same window, keeping both double-counts the day. The
//! dedup policy keys off this classifier, so the string matching lives here
//! rather than inline at the call sites.

/// Coarse class of the device that recorded a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Wrist-worn device; preferred source for additive metrics.
    Wearable,
    /// Phone-sourced; dropped where it overlaps wearable coverage.
    Phone,
    /// Anything else, including samples with no device field.
    Other,
}

impl DeviceClass {
    pub fn classify(device: Option<&str>) -> Self {
        match device {
            Some(d) if d.contains("Watch") => DeviceClass::Wearable,
            Some(d) if d.contains("iPhone") || d.contains("Phone") => DeviceClass::Phone,
            _ => DeviceClass::Other,
        }
    }

    /// Predicate used by the dedup pass.
    pub fn is_wearable(device: Option<&str>) -> bool {
        Self::classify(device) == DeviceClass::Wearable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_watch_strings() {
        assert_eq!(
            DeviceClass::classify(Some("Apple Watch Series 9")),
            DeviceClass::Wearable
        );
        assert_eq!(DeviceClass::classify(Some("Watch7,2")), DeviceClass::Wearable);
    }

    #[test]
    fn classifies_phone_strings() {
        assert_eq!(DeviceClass::classify(Some("iPhone 15 Pro")), DeviceClass::Phone);
        assert_eq!(DeviceClass::classify(Some("Phone")), DeviceClass::Phone);
    }

    #[test]
    fn missing_or_unknown_is_other() {
        assert_eq!(DeviceClass::classify(None), DeviceClass::Other);
        assert_eq!(DeviceClass::classify(Some("Oura Ring")), DeviceClass::Other);
        assert!(!DeviceClass::is_wearable(None));
        assert!(DeviceClass::is_wearable(Some("Apple Watch")));
    }
}
