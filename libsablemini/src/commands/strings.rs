pub struct Strings {}

impl Strings {
    // Error codes
    pub const VALUE_NOT_AN_INT_OR_OUT_OF_RANGE: &'static str =
        "ERR value is not an integer or out of range";
    pub const VALUE_NOT_VALID_FLOAT: &'static str = "ERR value is not a valid float";
    pub const SYNTAX_ERROR: &'static str = "ERR syntax error";
    pub const WRONGTYPE: &'static str =
        "WRONGTYPE Operation against a key holding the wrong kind of value";
    pub const QUEUED: &'static str = "QUEUED";
    pub const MULTI_NESTED: &'static str = "ERR MULTI calls can not be nested";
    pub const EXEC_WITHOUT_MULTI: &'static str = "ERR EXEC without MULTI";
    pub const EXEC_ABORT: &'static str =
        "EXECABORT Transaction discarded because of previous errors.";
    pub const DISCARD_WITHOUT_MULTI: &'static str = "ERR DISCARD without MULTI";
    pub const WATCH_INSIDE_MULTI: &'static str = "ERR WATCH inside MULTI is not allowed";
    pub const ZERR_MIN_MAX_NOT_FLOAT: &'static str = "ERR min or max is not a float";
    pub const ZERR_MIN_MAX_NOT_STRING_RANGE: &'static str =
        "ERR min or max not valid string range item";
    pub const ZERR_NX_XX: &'static str =
        "ERR XX and NX options at the same time are not compatible";
    pub const ZERR_GT_LT_NX: &'static str =
        "ERR GT, LT, and/or NX options at the same time are not compatible";
    pub const ZERR_INCR_SINGLE_PAIR: &'static str =
        "ERR INCR option supports a single increment-element pair";
    pub const ZERR_SCORE_NAN: &'static str = "ERR resulting score is not a number (NaN)";
    pub const INVALID_DB_INDEX: &'static str = "ERR invalid DB index";
    pub const DB_INDEX_OUT_OF_RANGE: &'static str = "ERR DB index is out of range";

    // General strings
    pub const POISONED_MUTEX: &'static str = "poisoned mutex";
}
