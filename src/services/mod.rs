pub mod first_blood;
pub mod notifier;
