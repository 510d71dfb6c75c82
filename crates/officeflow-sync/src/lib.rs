pub mod board;
pub mod protocol;
pub mod reconciler;
pub mod reducer;
pub mod state;
pub mod subscription;

pub use board::Board;
pub use protocol::{decode, Inbound, InboundEvent};
pub use reconciler::{Reconciler, ReconcilerHandle};
pub use reducer::{apply, Effect};
pub use state::{AppState, Store};
pub use subscription::Subscription;
