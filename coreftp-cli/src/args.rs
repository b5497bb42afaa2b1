use argh::FromArgs;

#[derive(FromArgs)]
#[argh(description = "Interactive FTP/FTPS client built on coreftp")]
pub struct Args {
    #[argh(switch, short = 'd', description = "enable TRACE log level")]
    pub debug: bool,
    #[argh(switch, short = 'v', description = "verbose mode")]
    pub verbose: bool,
    #[argh(switch, short = 'V', description = "print version")]
    pub version: bool,
    #[argh(option, short = 'P', description = "remote port (default: 21, or 990 with --implicit)")]
    pub port: Option<u16>,
    #[argh(option, short = 'u', description = "username; anonymous login when omitted")]
    pub user: Option<String>,
    #[argh(switch, description = "secure the session with AUTH TLS")]
    pub explicit: bool,
    #[argh(switch, description = "connect with implicit FTPS")]
    pub implicit: bool,
    #[argh(switch, description = "accept invalid certificates and host names")]
    pub insecure: bool,
    #[argh(positional, description = "host to connect to")]
    pub host: String,
}
