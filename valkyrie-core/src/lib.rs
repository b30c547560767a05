pub mod error;
pub use error::{AppError, DialogError, ErrorCode};

pub mod logging;
pub use logging::Logger;

pub mod fs {
    pub mod url_info;
    pub use url_info::UrlInfo;

    pub mod local_backend;
    pub use local_backend::LocalBackend;
}

pub mod dialog {
    pub mod backend;
    pub use backend::{BackendEvent, ListingBackend, ListingToken, OperationKind};

    pub mod url;
    pub use url::DialogUrl;

    pub mod sorted_list;
    pub use sorted_list::{SortKey, SortSpec, SortedEntryList};

    pub mod projection;
    pub use projection::{CompactItem, DetailItem, ViewKind, ViewProjection};

    pub mod navigation;
    pub use navigation::NavigationState;

    pub mod rename;
    pub use rename::{PressContext, RenameController, RenameState};

    pub mod filter;
    pub use filter::{FilterList, NameFilter};

    pub mod session;
    pub use session::{DialogSession, DialogSettings, SharedSession};

    pub mod file_dialog;
    pub use file_dialog::{
        ContextMenu, DialogCode, DialogSignal, FileDialog, MessageLevel, Mode, PopupAction, Query,
    };

    pub mod convenience;
    pub use convenience::{
        DialogRequest, DialogRunner, get_existing_directory, get_open_file_name,
        get_open_file_names, get_save_file_name,
    };

    #[cfg(test)]
    mod scenarios;
}

pub mod controller {
    pub mod keymap;
    pub use keymap::{DialogCommand, Focus};

    pub mod event_loop;
    pub use event_loop::TerminalRunner;
}

pub mod view {
    pub mod icons;

    pub mod theme;

    pub mod ui;
    pub use ui::{DialogView, MenuState, UiState};
}

pub mod app_settings;

pub use dialog::FileDialog;
pub use fs::LocalBackend;
