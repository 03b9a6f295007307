use async_trait::async_trait;

use super::{Page, PageArgs, PageId};
use crate::error::TrackingError;

/// Landing page; holds nothing
#[derive(Debug, Default)]
pub struct HomePage;

#[async_trait]
impl Page for HomePage {
    fn id(&self) -> PageId {
        PageId::Home
    }

    async fn activate(&mut self, _args: PageArgs) -> Result<(), TrackingError> {
        Ok(())
    }

    async fn deactivate(&mut self) {}
}
