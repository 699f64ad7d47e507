use crate::reconcile::MonitorSnapshot;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub snapshots: watch::Receiver<MonitorSnapshot>,
}
