//! Capabilities and status conditions.

/// The condition of a status response line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Success.
    Ok,
    /// Operational failure.
    No,
    /// Protocol or syntax failure.
    Bad,
    /// Greeting of an already-authenticated connection.
    PreAuth,
    /// The server is hanging up.
    Bye,
}

impl Status {
    /// True for the conditions that count as success.
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// One advertised server capability.
///
/// Only the capabilities this client acts on get their own variant; the
/// rest land in `Unknown` with their original (uppercased) spelling so
/// `has_capability` checks still work against them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// The base protocol, RFC 3501.
    Imap4Rev1,
    /// RFC 2177 server push.
    Idle,
    /// RFC 2342 namespace discovery.
    Namespace,
    /// RFC 4315 UID mapping (COPYUID/APPENDUID, UID EXPUNGE).
    UidPlus,
    /// RFC 6851 server-side move.
    Move,
    /// RFC 2088 non-synchronising literals.
    LiteralPlus,
    /// TLS upgrade from a plaintext connection.
    StartTls,
    /// The server refuses plain LOGIN (pre-TLS, usually).
    LoginDisabled,
    /// One SASL mechanism, e.g. `AUTH=PLAIN`.
    Auth(String),
    /// RFC 4959 initial SASL responses.
    SaslIr,
    /// RFC 5161 extension switching.
    Enable,
    /// RFC 8437 UTF-8 mailbox names and headers.
    Utf8Accept,
    /// RFC 7162 modification sequences.
    CondStore,
    /// RFC 7162 quick resynchronisation.
    QResync,
    /// RFC 2971 implementation identification.
    Id,
    /// RFC 3691 deselect without expunge.
    Unselect,
    /// RFC 6154 folder roles.
    SpecialUse,
    /// Gmail's pre-standard folder roles.
    XList,
    /// RFC 5819 STATUS inside LIST.
    ListStatus,
    /// RFC 4978 deflate transport compression.
    CompressDeflate,
    /// RFC 3516 binary sections (and RFC 7889 literal8 APPEND).
    Binary,
    /// RFC 5032 age-relative search.
    Within,
    /// RFC 8474 stable mailbox/message identifiers.
    ObjectId,
    /// RFC 2087 storage quotas.
    Quota,
    /// Maximum APPEND size, when the server names one.
    AppendLimit(Option<u64>),
    /// The Gmail extension bundle (labels, raw search, thread ids).
    XGmExt1,
    /// Anything not modelled above.
    Unknown(String),
}

impl Capability {
    /// Parses one advertised capability word.
    ///
    /// Parameterised capabilities (`AUTH=`, `APPENDLIMIT=`) split on the
    /// equals sign first; everything else is a plain atom lookup.
    #[must_use]
    pub fn parse(word: &str) -> Self {
        let upper = word.to_ascii_uppercase();

        if let Some(mechanism) = upper.strip_prefix("AUTH=") {
            return Self::Auth(mechanism.to_string());
        }
        if let Some(rest) = upper.strip_prefix("APPENDLIMIT") {
            return match rest.strip_prefix('=') {
                Some(limit) => Self::AppendLimit(limit.parse().ok()),
                None if rest.is_empty() => Self::AppendLimit(None),
                None => Self::Unknown(upper),
            };
        }

        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "IDLE" => Self::Idle,
            "NAMESPACE" => Self::Namespace,
            "UIDPLUS" => Self::UidPlus,
            "MOVE" => Self::Move,
            "LITERAL+" => Self::LiteralPlus,
            "STARTTLS" => Self::StartTls,
            "LOGINDISABLED" => Self::LoginDisabled,
            "SASL-IR" => Self::SaslIr,
            "ENABLE" => Self::Enable,
            "UTF8=ACCEPT" => Self::Utf8Accept,
            "CONDSTORE" => Self::CondStore,
            "QRESYNC" => Self::QResync,
            "ID" => Self::Id,
            "UNSELECT" => Self::Unselect,
            "SPECIAL-USE" => Self::SpecialUse,
            "XLIST" => Self::XList,
            "LIST-STATUS" => Self::ListStatus,
            "COMPRESS=DEFLATE" => Self::CompressDeflate,
            "BINARY" => Self::Binary,
            "WITHIN" => Self::Within,
            "OBJECTID" => Self::ObjectId,
            "QUOTA" => Self::Quota,
            "X-GM-EXT-1" => Self::XGmExt1,
            _ => Self::Unknown(upper),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only the parameterised variants need formatting; the rest are
        // fixed wire words
        match self {
            Self::Auth(mechanism) => return write!(f, "AUTH={mechanism}"),
            Self::AppendLimit(Some(limit)) => return write!(f, "APPENDLIMIT={limit}"),
            Self::Unknown(word) => return f.write_str(word),
            _ => {}
        }

        f.write_str(match self {
            Self::Imap4Rev1 => "IMAP4rev1",
            Self::Idle => "IDLE",
            Self::Namespace => "NAMESPACE",
            Self::UidPlus => "UIDPLUS",
            Self::Move => "MOVE",
            Self::LiteralPlus => "LITERAL+",
            Self::StartTls => "STARTTLS",
            Self::LoginDisabled => "LOGINDISABLED",
            Self::SaslIr => "SASL-IR",
            Self::Enable => "ENABLE",
            Self::Utf8Accept => "UTF8=ACCEPT",
            Self::CondStore => "CONDSTORE",
            Self::QResync => "QRESYNC",
            Self::Id => "ID",
            Self::Unselect => "UNSELECT",
            Self::SpecialUse => "SPECIAL-USE",
            Self::XList => "XLIST",
            Self::ListStatus => "LIST-STATUS",
            Self::CompressDeflate => "COMPRESS=DEFLATE",
            Self::Binary => "BINARY",
            Self::Within => "WITHIN",
            Self::ObjectId => "OBJECTID",
            Self::Quota => "QUOTA",
            Self::XGmExt1 => "X-GM-EXT-1",
            Self::AppendLimit(None) => "APPENDLIMIT",
            Self::Auth(_) | Self::AppendLimit(Some(_)) | Self::Unknown(_) => unreachable!(),
        })
    }
}
