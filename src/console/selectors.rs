//! Paths and element locators of the vendor console

use std::borrow::Cow;

use crate::driver::Locator;

pub const ACCOUNT_SWITCHER_PATH: &str = "/account-switcher/regional/vendorGroup";
pub const DEVELOPER_CONSOLE_PATH: &str = "/sellingpartner/developerconsole?ref_=vc_xx_subNav";
/// Every sign-in and MFA page lives under this path
pub const SIGN_IN_PATH_MARKER: &str = "/ap/";

// Sign-in
pub const EMAIL_FIELD: Locator = Locator::css("#ap_email");
pub const CONTINUE_BUTTON: Locator = Locator::css("#continue");
pub const PASSWORD_FIELD: Locator = Locator::css("#ap_password");
pub const SIGN_IN_BUTTON: Locator = Locator::css("#signInSubmit");
pub const OTP_FIELD: Locator = Locator::css("#auth-mfa-otpcode");
pub const OTP_SUBMIT_BUTTON: Locator = Locator::css("#auth-signin-button");

// Account switcher
pub const ACCOUNT_LIST: Locator = Locator::css(".full-page-account-switcher-accounts");
pub const ACCOUNT_ENTRY: Locator = Locator::css(".full-page-account-switcher-account");
pub const ACCOUNT_LABEL: Locator = Locator::css(".full-page-account-switcher-account-label");
pub const ACCOUNT_SELECTOR: Locator = Locator::css(".full-page-account-switcher-account-details");
pub const ACCOUNT_SUBMIT: Locator = Locator::xpath(
    "//button[contains(@class, 'kat-button--primary') and contains(@class, 'kat-button--base')]",
);

// Developer console
pub const APPLICATION_TABLE: Locator = Locator::css("#applicationTableBody");
pub const PROFILE_ALERT: Locator =
    Locator::xpath("//div[contains(text(), 'You need to complete your Developer Profile')]");

// Application detail overlay
pub const OPEN_MODAL: Locator = Locator::css("kat-modal[role='dialog'][aria-modal='true']");
pub const VISIBLE_MODAL: Locator =
    Locator::css("kat-modal[role='dialog'][aria-modal='true'][visible='true']");
pub const MODAL_CLOSE: Locator = Locator::css("button.close");
pub const CLIENT_ID_INPUT: Locator = Locator::css("#clientIdInput");
pub const SECRET_EXPANDER: Locator = Locator::css(
    "kat-modal[role='dialog'][aria-modal='true'][visible='true'] > span:nth-child(2) > kat-expander",
);
pub const EXPANDER_TOGGLE: Locator =
    Locator::css("div.wrapper > button > div.header__toggle > slot > kat-icon");
pub const SECRET_INPUT: Locator = Locator::css(".clientSecretDiv kat-input");
/// Relative to the visible modal
pub const EXPIRATION_NOTICE: Locator = Locator::xpath(".//span/div/i");

// Renewal dialog
pub const RENEW_BUTTON: Locator = Locator::css("kat-button.footerLeftButton[variant='primary']");
pub const CONFIRM_BUTTON: Locator = Locator::css("kat-button.footerConfirmationButton");
pub const DONE_BUTTON: Locator = Locator::css("kat-button.footerRightButton");

/// Script click, for controls that sit under an overlay or inside a shadow root
pub const SCRIPT_CLICK: &str = "arguments[0].click();";

/// "View" link of the application in `row` (1-based) of the application table
pub fn view_link(row: usize) -> Locator {
    Locator::XPath(Cow::Owned(format!(
        "//kat-table[2]/kat-table-body/kat-table-row[{}]/kat-table-cell[3]/div/kat-link",
        row
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_link_targets_row() {
        let link = view_link(3);
        assert_eq!(link.strategy(), "xpath");
        assert!(link.value().contains("kat-table-row[3]"));
    }
}
