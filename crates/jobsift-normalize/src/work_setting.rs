use jobsift_core::WorkSetting;

/// Collapse the explicit work-setting text and the raw location text into one
/// of the three settings. Remote and hybrid need a positive textual signal;
/// any other explicit text counts as in-person, and so does no signal at all.
pub fn resolve_work_setting(explicit: Option<&str>, location: Option<&str>) -> WorkSetting {
    let explicit = explicit.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);
    let location = location.map(str::to_lowercase);

    if let Some(text) = &explicit {
        if text.contains("remote") {
            return WorkSetting::Remote;
        }
        if text.contains("hybrid") {
            return WorkSetting::Hybrid;
        }
    }
    if location.as_deref().is_some_and(|l| l.contains("remote")) {
        return WorkSetting::Remote;
    }
    WorkSetting::InPerson
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_signals_win_in_rule_order() {
        assert_eq!(resolve_work_setting(Some("Remote"), None), WorkSetting::Remote);
        assert_eq!(resolve_work_setting(Some("Hybrid remote"), None), WorkSetting::Remote);
        assert_eq!(
            resolve_work_setting(Some("Hybrid work"), Some("Remote in Austin, TX")),
            WorkSetting::Hybrid
        );
    }

    #[test]
    fn location_can_signal_remote() {
        assert_eq!(
            resolve_work_setting(None, Some("Remote in Austin, TX")),
            WorkSetting::Remote
        );
        assert_eq!(
            resolve_work_setting(Some("In-person"), Some("Remote")),
            WorkSetting::Remote
        );
    }

    #[test]
    fn unrecognized_or_missing_is_in_person() {
        assert_eq!(resolve_work_setting(Some("On the road"), None), WorkSetting::InPerson);
        assert_eq!(resolve_work_setting(Some("   "), Some("Austin, TX")), WorkSetting::InPerson);
        assert_eq!(resolve_work_setting(None, None), WorkSetting::InPerson);
    }
}
