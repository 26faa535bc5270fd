//! LDAP result codes used by the relocation engine

pub const SUCCESS: u32 = 0;
pub const OPERATIONS_ERROR: u32 = 1;
pub const PROTOCOL_ERROR: u32 = 2;
pub const TIME_LIMIT_EXCEEDED: u32 = 3;
pub const SIZE_LIMIT_EXCEEDED: u32 = 4;
pub const REFERRAL: u32 = 10;
pub const ADMIN_LIMIT_EXCEEDED: u32 = 11;
pub const UNAVAILABLE_CRITICAL_EXTENSION: u32 = 12;
pub const NO_SUCH_ATTRIBUTE: u32 = 16;
pub const UNDEFINED_ATTRIBUTE_TYPE: u32 = 17;
pub const NO_SUCH_OBJECT: u32 = 32;
pub const INVALID_DN_SYNTAX: u32 = 34;
pub const INVALID_CREDENTIALS: u32 = 49;
pub const INSUFFICIENT_ACCESS: u32 = 50;
pub const BUSY: u32 = 51;
pub const UNAVAILABLE: u32 = 52;
pub const UNWILLING_TO_PERFORM: u32 = 53;
pub const NAMING_VIOLATION: u32 = 64;
pub const OBJECT_CLASS_VIOLATION: u32 = 65;
pub const NOT_ALLOWED_ON_NON_LEAF: u32 = 66;
pub const NOT_ALLOWED_ON_RDN: u32 = 67;
pub const ALREADY_EXISTS: u32 = 68;
pub const AFFECTS_MULTIPLE_DSAS: u32 = 71;
pub const OTHER: u32 = 80;
/// Client-side: the connection to the server was lost or never established.
pub const SERVER_DOWN: u32 = 81;
/// Client-side: the requested feature or control is not supported.
pub const NOT_SUPPORTED: u32 = 92;

/// Human-readable text for a result code.
pub fn result_code_text(rc: u32) -> &'static str {
    match rc {
        SUCCESS => "Success",
        OPERATIONS_ERROR => "Operations error",
        PROTOCOL_ERROR => "Protocol error",
        TIME_LIMIT_EXCEEDED => "Time limit exceeded",
        SIZE_LIMIT_EXCEEDED => "Size limit exceeded",
        REFERRAL => "Referral",
        ADMIN_LIMIT_EXCEEDED => "Administrative limit exceeded",
        UNAVAILABLE_CRITICAL_EXTENSION => "Critical extension is unavailable",
        NO_SUCH_ATTRIBUTE => "No such attribute",
        UNDEFINED_ATTRIBUTE_TYPE => "Undefined attribute type",
        NO_SUCH_OBJECT => "No such object",
        INVALID_DN_SYNTAX => "Invalid DN syntax",
        INVALID_CREDENTIALS => "Invalid credentials",
        INSUFFICIENT_ACCESS => "Insufficient access",
        BUSY => "Server is busy",
        UNAVAILABLE => "Server is unavailable",
        UNWILLING_TO_PERFORM => "Server is unwilling to perform",
        NAMING_VIOLATION => "Naming violation",
        OBJECT_CLASS_VIOLATION => "Object class violation",
        NOT_ALLOWED_ON_NON_LEAF => "Operation not allowed on non-leaf",
        NOT_ALLOWED_ON_RDN => "Operation not allowed on RDN",
        ALREADY_EXISTS => "Already exists",
        AFFECTS_MULTIPLE_DSAS => "Operation affects multiple DSAs",
        OTHER => "Internal (implementation specific) error",
        SERVER_DOWN => "Can't contact LDAP server",
        NOT_SUPPORTED => "Not Supported",
        _ => "Unknown error",
    }
}
