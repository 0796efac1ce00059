mod peer_id;
mod sha1;
mod transfer_rate;

pub use peer_id::*;
pub use self::sha1::*;
pub use transfer_rate::*;
