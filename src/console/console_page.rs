use anyhow::Result;

/// Page-level operations on the vendor console.
///
/// Each method performs one user-visible step and waits (bounded) for the
/// page to settle. Element scoping, shadow roots and selectors stay behind
/// this trait so the workflow only deals with accounts and applications.
#[async_trait::async_trait]
pub trait ConsolePage: Send + Sync {
    /// Open the sign-in page and submit the account email
    async fn submit_identity(&self, email: &str) -> Result<()>;

    async fn submit_password(&self, password: &str) -> Result<()>;

    async fn submit_one_time_code(&self, code: &str) -> Result<()>;

    /// Wait until the browser has left the sign-in flow
    async fn await_landing(&self) -> Result<()>;

    /// Open the account switcher and return the visible account labels in order
    async fn account_labels(&self) -> Result<Vec<String>>;

    /// Click the selector of the account at `index` in the switcher list
    async fn choose_account(&self, index: usize) -> Result<()>;

    /// Press the switcher's submit control; `false` when the page has none
    async fn confirm_account_choice(&self) -> Result<bool>;

    /// Navigate to the developer console's application list
    async fn open_developer_console(&self) -> Result<()>;

    /// Whether the console asks the client to finish their developer profile
    async fn developer_profile_incomplete(&self) -> Result<bool>;

    async fn await_application_table(&self) -> Result<()>;

    /// Close a detail overlay left open by an earlier step, if any
    async fn dismiss_overlay(&self) -> Result<()>;

    /// Open the detail view of the application in `row` (1-based)
    async fn open_application(&self, row: usize) -> Result<()>;

    /// Client identifier shown in the open detail view
    async fn displayed_client_id(&self) -> Result<Option<String>>;

    async fn close_application(&self) -> Result<()>;

    /// Expand the credentials section so the secret becomes readable
    async fn reveal_secret(&self) -> Result<()>;

    async fn secret_value(&self) -> Result<Option<String>>;

    /// Free text of the expiration notice, e.g. `Expires: 2025-06-01T00:00:00Z`
    async fn expiration_text(&self) -> Result<Option<String>>;

    async fn request_renewal(&self) -> Result<()>;

    async fn confirm_renewal(&self) -> Result<()>;

    /// Dismiss the renewal completion dialog
    async fn acknowledge_renewal(&self) -> Result<()>;

    /// Release the browser
    async fn close(&self) -> Result<()>;
}
