//! src/view/icons.rs
//! ============================================================================
//! # Entry icons (Nerd Fonts)

use crate::fs::url_info::UrlInfo;

pub const FOLDER_ICON: &str = "\u{f115}";
pub const PARENT_ICON: &str = "\u{f062}";
pub const FILE_ICON: &str = "\u{f15b}";
pub const SYMLINK_ICON: &str = "\u{f0c1}";

pub fn icon_for(info: &UrlInfo) -> &'static str {
    if info.is_parent_entry() {
        PARENT_ICON
    } else if info.is_symlink {
        SYMLINK_ICON
    } else if info.is_dir {
        FOLDER_ICON
    } else {
        FILE_ICON
    }
}
