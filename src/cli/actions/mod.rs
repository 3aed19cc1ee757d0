pub mod server;

mod run;

use crate::config::Settings;

#[derive(Debug)]
pub enum Action {
    Server(Settings),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
