pub mod category;
pub mod participant;
pub mod poll_scheduler;
pub mod prediction_view;
pub mod ranking;
pub mod snapshot;
pub mod time_codec;
