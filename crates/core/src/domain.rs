use std::fmt;
use std::path::PathBuf;

/// A printable-text run recovered from a raw log file.
pub type RawLine = String;

/// Kind of application event a recovered line plausibly represents.
///
/// A single line may fall into several categories at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    OnlineStatus,
    ChatState,
    MessageType,
    MessageDeleted,
    ContactBlocked,
    Battery,
    GroupAction,
    StatusAction,
    ReadAction,
    MediaSent,
    MediaReceived,
}

impl Category {
    /// Every category, in rule evaluation order.
    pub const ALL: [Category; 11] = [
        Category::OnlineStatus,
        Category::ChatState,
        Category::MessageType,
        Category::MessageDeleted,
        Category::ContactBlocked,
        Category::Battery,
        Category::GroupAction,
        Category::StatusAction,
        Category::ReadAction,
        Category::MediaSent,
        Category::MediaReceived,
    ];

    /// Literal substring that places a line in this category.
    pub fn marker(self) -> &'static str {
        match self {
            Category::OnlineStatus => "action,presence",
            Category::ChatState => "action,chatstate",
            Category::MessageType => "action,message",
            Category::MessageDeleted => "action,msgs",
            Category::ContactBlocked => "action,block",
            Category::Battery => "action,battery",
            Category::GroupAction => "action,group",
            Category::StatusAction => "action,status",
            Category::ReadAction => "action,chat,",
            Category::MediaSent => "Media:sendToChat",
            Category::MediaReceived => "action,msg,relay",
        }
    }

    /// Artifact type name used when persisting into a case database.
    pub fn artifact_type(self) -> &'static str {
        match self {
            Category::OnlineStatus => "TSK_ONLINE_STATUS",
            Category::ChatState => "TSK_CHAT_STATE",
            Category::MessageType => "TSK_MSG",
            Category::MessageDeleted => "TSK_MSG_DELETE",
            Category::ContactBlocked => "TSK_BLOCKED",
            Category::Battery => "TSK_BATTERY",
            Category::GroupAction => "TSK_GROUP",
            Category::StatusAction => "TSK_STATUS_INFO",
            Category::ReadAction => "TSK_READ_INFO",
            Category::MediaSent => "TSK_MSG_SEND",
            Category::MediaReceived => "TSK_RCV_MEDIA",
        }
    }

    /// Human readable artifact name.
    pub fn display_name(self) -> &'static str {
        match self {
            Category::OnlineStatus => "Online Status",
            Category::ChatState => "Chat State",
            Category::MessageType => "Sent Media",
            Category::MessageDeleted => "Message Deleted",
            Category::ContactBlocked => "Contacts Blocked",
            Category::Battery => "Battery Percent",
            Category::GroupAction => "Group creation",
            Category::StatusAction => "Status/Story Actions",
            Category::ReadAction => "Reading Message",
            Category::MediaSent => "Sending Message",
            Category::MediaReceived => "Receiving Message",
        }
    }

    /// Attribute type name holding the extracted field value.
    pub fn attribute_type(self) -> &'static str {
        match self {
            Category::OnlineStatus => "TSK_ONLINE_STATUS",
            Category::ChatState => "TSK_CHAT_STATE_NAME",
            Category::MessageType => "TSK_MSG_TYPE",
            Category::MessageDeleted => "TSK_DELETE",
            Category::ContactBlocked => "TSK_IF_BLOCKED",
            Category::Battery => "TSK_BATTERY_PERCENT",
            Category::GroupAction => "TSK_GRP_ACTION",
            Category::StatusAction => "TSK_STATUS_ACTION",
            Category::ReadAction => "TSK_READ",
            Category::MediaSent => "TSK_SENT",
            Category::MediaReceived => "TSK_RCV",
        }
    }

    pub fn attribute_description(self) -> &'static str {
        match self {
            Category::OnlineStatus => "status",
            Category::ChatState => "state",
            Category::MessageType => "msg type",
            Category::ContactBlocked => "if blocked",
            Category::Battery => "battery",
            Category::MessageDeleted
            | Category::GroupAction
            | Category::StatusAction
            | Category::ReadAction
            | Category::MediaSent
            | Category::MediaReceived => "action",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Attribute type under which event timestamps are stored.
pub const TIMESTAMP_ATTRIBUTE_TYPE: &str = "TSK_TIME_STAMP";
pub const TIMESTAMP_ATTRIBUTE_DESCRIPTION: &str = "time stamp";

/// One structured record recovered from a log line.
///
/// `field_value` and `timestamp` are independently optional; a missing value is a
/// normal outcome of a heuristic that did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub category: Category,
    pub field_value: Option<String>,
    pub timestamp: Option<String>, // "YYYY-MM-DD HH:MM:SS.mmm"
}

/// A candidate log file located by an evidence source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: u64,
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Outcome of scanning a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub lines_scanned: u64,
    pub events_emitted: u64,
    pub bytes_read: u64,
    /// First hostname seen in the file, if any.
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file: SourceFile,
    pub reason: String,
}

/// Totals for a whole multi-file run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_found: usize,
    pub files_processed: usize,
    pub events_emitted: u64,
    pub failures: Vec<FileFailure>,
    pub cancelled: bool,
}
