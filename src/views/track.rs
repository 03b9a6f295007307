use async_trait::async_trait;

use super::{Page, PageArgs, PageId};
use crate::error::TrackingError;
use crate::tracking::TrackingSession;

/// "Track my bus": one [`TrackingSession`] bound to the tracking map
pub struct TrackPage {
    session: TrackingSession,
}

impl TrackPage {
    pub fn new(session: TrackingSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }
}

#[async_trait]
impl Page for TrackPage {
    fn id(&self) -> PageId {
        PageId::Track
    }

    async fn activate(&mut self, args: PageArgs) -> Result<(), TrackingError> {
        match args {
            PageArgs::Track { bus_reg } => self.session.start(&bus_reg).await,
            // Empty form; tracking starts on submit
            PageArgs::None => Ok(()),
            other => {
                tracing::warn!(args = ?other, "Ignoring arguments meant for another page");
                Ok(())
            }
        }
    }

    async fn deactivate(&mut self) {
        self.session.stop().await;
    }
}
