pub mod export;
pub mod ranked_view;
