pub mod help_overlay;
pub mod liked_sidebar;
pub mod now_playing;
pub mod search_modal;
