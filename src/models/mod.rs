pub mod achievements;
pub mod settings;

pub use achievements::{
    AchievementDefinition, GameIdentifier, GameMetadataEntry, GameProgressWatermark,
    LocalAchievementRecord, LocalizedText, NotificationRequest,
};
pub use settings::Settings;
