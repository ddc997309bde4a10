// Settlement: trigger rules, the settlement run and its follow-up notice
pub mod notifier;
pub mod runner;
pub mod triggers;
