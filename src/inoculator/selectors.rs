//! Locators for the Inoculator project pages.

use crate::tracker::OperationKind;
use crate::webdriver::Locator;

pub const ROWS: &str = r#"div[role="row"]"#;
pub const CREATED_AT_CELL: &str = r#"div[data-field="createdAt"] p"#;
pub const UPDATED_AT_CELL: &str = r#"div[data-field="updatedAt"] p"#;
pub const STATUS_CELL: &str = r#"div[data-field="status"]"#;

pub const SUCCESS_ICON: &str = r#"svg[data-testid="CheckCircleIcon"], svg.css-bv3s9b"#;
pub const FAILURE_ICON: &str = r#"svg[data-testid="HighlightOffIcon"], svg.css-mfr23f"#;
pub const PROGRESS_ICON: &str = "svg.MuiCircularProgress-svg, svg.css-13o7eu2";

pub const CAM_CHECKBOX: &str = r#"input.PrivateSwitchBase-input[type="checkbox"]"#;

pub const EMAIL_INPUT: &str = r#"input[name="email"]"#;
pub const PASSWORD_INPUT: &str = r#"input[name="password"]"#;

pub fn css(selector: &str) -> Locator {
    Locator::css(selector)
}

/// Icon on the project toolbar that opens the job listing for `kind`.
pub fn tab_icon(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Generate | OperationKind::GenerateWithOption => "ConstructionIcon",
        OperationKind::Simulate => "DvrIcon",
        OperationKind::Export(_) => "ImportExportIcon",
    }
}

/// Text of the button that starts a job of `kind`.
pub fn action_label(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Generate | OperationKind::GenerateWithOption => "Generate Design",
        OperationKind::Simulate => "New",
        OperationKind::Export(_) => "Export Package",
    }
}

pub fn tab_button(kind: OperationKind) -> Locator {
    Locator::xpath(format!(
        "//button[.//*[@data-testid='{}']]",
        tab_icon(kind)
    ))
}

/// A button whose visible text is exactly `text`.
pub fn button_with_text(text: &str) -> Locator {
    Locator::xpath(format!("//button[normalize-space(.)='{text}']"))
}

/// Checkbox associated with a visible label or an aria-label.
pub fn labeled_checkbox(label: &str) -> Locator {
    Locator::xpath(format!(
        "//label[normalize-space(.)='{label}']//input[@type='checkbox'] \
         | //input[@type='checkbox'][@aria-label='{label}']"
    ))
}

pub fn request_otp() -> Locator {
    Locator::xpath("//*[normalize-space(text())='Request OTP']")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::ExportType;

    #[test]
    fn tabs_per_kind() {
        assert_eq!(tab_icon(OperationKind::GenerateWithOption), "ConstructionIcon");
        assert_eq!(tab_icon(OperationKind::Simulate), "DvrIcon");
        assert_eq!(
            tab_icon(OperationKind::Export(ExportType::Clean)),
            "ImportExportIcon"
        );
    }

    #[test]
    fn tab_button_xpath() {
        assert_eq!(
            tab_button(OperationKind::Simulate),
            Locator::xpath("//button[.//*[@data-testid='DvrIcon']]")
        );
    }

    #[test]
    fn action_buttons_match_exact_text() {
        assert_eq!(
            button_with_text(action_label(OperationKind::Generate)),
            Locator::xpath("//button[normalize-space(.)='Generate Design']")
        );
        assert_eq!(action_label(OperationKind::Simulate), "New");
    }

    #[test]
    fn labeled_checkbox_covers_aria_label() {
        let Locator::XPath(expr) = labeled_checkbox("Obfuscated") else {
            panic!("expected xpath");
        };
        assert!(expr.contains("normalize-space(.)='Obfuscated'"));
        assert!(expr.contains("@aria-label='Obfuscated'"));
    }
}
