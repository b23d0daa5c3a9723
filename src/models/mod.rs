pub mod driver;
pub mod outreach;
pub mod preference;
pub mod quota;
pub mod score;
