//! Pure read-side computations over store rows: the contacts status
//! partition, email dot-variations, commission rollups and the daily
//! credit-reset clock. Nothing here touches the store.

pub mod commission;
pub mod credits;
pub mod partition;
pub mod variations;

pub use commission::{CommissionError, CommissionRates, CommissionReport, Money, Rate, format_php};
pub use credits::{Countdown, copy_window_active, countdown, next_monthly_credits, next_reset_after};
pub use partition::{StatusPartition, partition_by_status, priority};
pub use variations::{base_emails, email_variations};
