pub mod engagement;
pub mod fingerprint;

pub use engagement::score as engagement_score;
pub use fingerprint::{fingerprint, ChangeFingerprinter, Fingerprint, FingerprintSet};
