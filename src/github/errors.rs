use octocrab::Error as OctocrabError;

#[derive(Debug)]
pub enum GitHubError {
    TokenNotFound(String),
    ApiError(OctocrabError),
    UnexpectedStatus { status: u16, context: String },
}

impl From<OctocrabError> for GitHubError {
    fn from(err: OctocrabError) -> Self {
        GitHubError::ApiError(err)
    }
}

impl std::fmt::Display for GitHubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitHubError::TokenNotFound(msg) => {
                writeln!(f, "GitHub Authentication Error")?;
                writeln!(f, "──────────────────────────")?;
                write!(f, "🔑 {msg}\n\n")?;
                writeln!(f, "🔧 QUICK FIXES:")?;
                writeln!(
                    f,
                    "   → Set token directly: export MGMT_FLEET_GITHUB_TOKEN=your_token"
                )?;
                writeln!(f, "   → Or reuse the GitHub CLI token: export GITHUB_TOKEN=\"$(gh auth token)\"")?;
                write!(
                    f,
                    "     (needs 'repo' and 'workflow' scopes for the management repositories)"
                )
            }
            GitHubError::ApiError(octocrab_err) => match octocrab_err {
                octocrab::Error::GitHub { source, .. } => {
                    write!(
                        f,
                        "GitHub API error: HTTP {}: {}",
                        source.status_code, source.message
                    )
                }
                octocrab::Error::Http { .. } => {
                    write!(f, "GitHub API error: network connection failed")
                }
                other => write!(f, "GitHub API error: {other}"),
            },
            GitHubError::UnexpectedStatus { status, context } => {
                write!(f, "unexpected HTTP status {status} from {context}")
            }
        }
    }
}

impl std::error::Error for GitHubError {}
