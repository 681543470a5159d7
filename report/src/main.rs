use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use ohmage_core::models::AuthorizationQuery;
use ohmage_core::utils::StringUtils;
use ohmage_core::validators;
use ohmage_core::CampaignFilter;
use ohmage_report::commands::{self, respond, Report};
use ohmage_report::config::ReportConfig;

#[derive(Parser, Debug)]
#[clap(author, version, about = "ohmage campaign authorization and survey response reports")]
struct Args {
    /// Config file path
    #[clap(short, long, env = "OHMAGE_REPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Facts snapshot path
    #[clap(long, env = "OHMAGE_FACTS")]
    facts: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[clap(long, env = "OHMAGE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Fail on result rows that are not grouped by survey response
    #[clap(long, env = "OHMAGE_ENFORCE_ROW_ORDER")]
    enforce_row_order: Option<bool>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a requester may perform an operation
    Authorize {
        #[clap(long)]
        requester: String,
        /// Campaign ids, checked in order
        #[clap(long, required = true)]
        campaign: Vec<String>,
        /// Operation name, e.g. view_survey_responses
        #[clap(long)]
        operation: String,
        #[clap(long)]
        target: Option<String>,
        /// Comma separated roles for grant_or_revoke_roles
        #[clap(long)]
        roles: Option<String>,
    },

    /// List the campaigns of a user
    Select(SelectArgs),

    /// Members of a campaign grouped by role
    Roster {
        #[clap(long)]
        requester: String,
        #[clap(long)]
        campaign: String,
    },

    /// Check a user;role,user;role grant list
    Grant {
        #[clap(long)]
        requester: String,
        #[clap(long)]
        campaign: String,
        #[clap(long)]
        user_role_list: String,
    },

    /// Check access to personal information of users
    PersonalInfo {
        #[clap(long)]
        requester: String,
        /// Comma separated usernames
        #[clap(long)]
        users: String,
    },

    /// Project survey response rows into a report
    Project {
        #[clap(long)]
        requester: String,
        #[clap(long)]
        campaign: String,
        #[clap(long)]
        target: Option<String>,
        /// JSON array of result rows
        #[clap(long)]
        rows: PathBuf,
        /// JSON projection request, every column when omitted
        #[clap(long)]
        request: Option<PathBuf>,
        #[clap(long)]
        campaign_name: Option<String>,
        #[clap(long)]
        campaign_version: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct SelectArgs {
    #[clap(long)]
    user: String,
    /// Comma separated campaign ids to start from
    #[clap(long)]
    campaigns: Option<String>,
    /// Comma separated class ids
    #[clap(long)]
    classes: Option<String>,
    /// YYYY-MM-DD or RFC 3339
    #[clap(long)]
    start_date: Option<String>,
    /// YYYY-MM-DD or RFC 3339
    #[clap(long)]
    end_date: Option<String>,
    #[clap(long)]
    privacy_state: Option<String>,
    #[clap(long)]
    running_state: Option<String>,
    #[clap(long)]
    role: Option<String>,
}

impl SelectArgs {
    fn filter(&self) -> ohmage_report::Result<CampaignFilter> {
        Ok(CampaignFilter {
            campaign_ids: commands::parse_id_list(self.campaigns.as_deref()),
            class_ids: commands::parse_id_list(self.classes.as_deref()),
            start_date: self.start_date.as_deref().map(commands::parse_date).transpose()?,
            end_date: self.end_date.as_deref().map(commands::parse_date).transpose()?,
            privacy_state: validators::validate_privacy_state(self.privacy_state.as_deref().unwrap_or_default())?,
            running_state: validators::validate_running_state(self.running_state.as_deref().unwrap_or_default())?,
            role: validators::validate_role(self.role.as_deref().unwrap_or_default())?,
        })
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = ReportConfig::new();

    if let Some(config_path) = &args.config {
        config = ReportConfig::from_file(config_path)?;
    }

    // Override config with command-line arguments
    if let Some(facts) = args.facts {
        config.facts_path = Some(facts);
    }
    if let Some(log_level) = args.log_level {
        config.core.log_level = log_level;
    }
    if let Some(enforce_row_order) = args.enforce_row_order {
        config.core.projection.enforce_row_order = enforce_row_order;
    }

    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, config.core.log_level.as_str()),
    );

    let report = Report::load(config)?;
    info!("Running {:?}", args.command);

    let outcome = match args.command {
        Command::Authorize { requester, campaign, operation, target, roles } => {
            commands::operation_from_name(&operation, roles.as_deref()).and_then(|operation| {
                report.authorize(&AuthorizationQuery {
                    requester,
                    campaign_ids: campaign,
                    target_user: target,
                    operation,
                })
            })
        }
        Command::Select(select) => select.filter().and_then(|filter| report.select(&select.user, &filter)),
        Command::Roster { requester, campaign } => report.roster(&requester, &campaign),
        Command::Grant { requester, campaign, user_role_list } => {
            report.grant(&requester, &campaign, &user_role_list)
        }
        Command::PersonalInfo { requester, users } => {
            let users: Vec<String> = StringUtils::split_list(&users, validators::LIST_ITEM_SEPARATOR)
                .into_iter()
                .map(str::to_string)
                .collect();
            report.personal_info(&requester, &users)
        }
        Command::Project {
            requester,
            campaign,
            target,
            rows,
            request,
            campaign_name,
            campaign_version,
        } => commands::load_rows(&rows).and_then(|rows| {
            let mut request = commands::load_request(request.as_deref())?;
            if campaign_name.is_some() {
                request.campaign_name = campaign_name;
            }
            if campaign_version.is_some() {
                request.campaign_version = campaign_version;
            }
            report.project(&requester, &campaign, target.as_deref(), &rows, &request)
        }),
    };

    let body = respond(outcome);
    println!("{}", serde_json::to_string_pretty(&body)?);

    if body["result"] != "success" {
        std::process::exit(1);
    }

    Ok(())
}
