use anyhow::Result;

pub mod report;
pub mod serve;

pub use report::ReportCommand;
pub use serve::ServeCommand;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
