#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for inspecting a SmarterMail server (read-only)

use clap::{Parser, Subcommand};
use serde::Serialize;
use smartermail_provider::{
    LicenseEdition, MailAccount, MailAlias, MailDomain, MailGroup, MailList, ProviderConfig,
    SmarterMailClient,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smartermail-cli")]
#[command(about = "Read-only CLI for SmarterMail provisioning data")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List all domains
    Domains,

    /// Show one domain's settings and limits
    Domain {
        /// Domain name
        name: String,
    },

    /// List the alias domains of a domain
    DomainAliases {
        /// Domain name
        domain: String,
    },

    /// List mailboxes of a domain
    Accounts {
        /// Domain name
        domain: String,
    },

    /// Show one mailbox
    Account {
        /// Email address
        email: String,
    },

    /// List single-target aliases of a domain
    Aliases {
        /// Domain name
        domain: String,
    },

    /// List groups of a domain
    Groups {
        /// Domain name
        domain: String,
    },

    /// List mailing lists of a domain
    Lists {
        /// Domain name
        domain: String,
    },

    /// Show one mailing list with its subscribers
    List {
        /// List address
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ProviderConfig::from_env()?;
    let client = SmarterMailClient::new(config)?;

    match &args.command {
        Command::Domains => {
            let domains = client.domains().await?;
            output(&args, &domains, |d| print_names(d, "domain"))?;
        }
        Command::Domain { name } => {
            let domain = client.domain(name).await?;
            output(&args, &domain, print_domain)?;
        }
        Command::DomainAliases { domain } => {
            let aliases = client.domain_aliases(domain).await?;
            output(&args, &aliases, |a| print_names(a, "domain alias"))?;
        }
        Command::Accounts { domain } => {
            let accounts = client.accounts(domain).await?;
            output(&args, &accounts, |a| print_accounts(a))?;
        }
        Command::Account { email } => {
            let account = client.account(email).await?;
            output(&args, &account, print_account)?;
        }
        Command::Aliases { domain } => {
            let aliases = client.aliases(domain).await?;
            output(&args, &aliases, |a| print_aliases(a))?;
        }
        Command::Groups { domain } => {
            let groups = client.groups(domain).await?;
            output(&args, &groups, |g| print_groups(g))?;
        }
        Command::Lists { domain } => {
            let lists = client.lists(domain).await?;
            output(&args, &lists, |l| print_lists(l))?;
        }
        Command::List { name } => {
            let list = client.list(name).await?;
            output(&args, &list, print_list)?;
        }
    }

    Ok(())
}

fn output<T: Serialize + ?Sized>(args: &Args, value: &T, text: impl Fn(&T)) -> anyhow::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn print_names(names: &[String], what: &str) {
    if names.is_empty() {
        println!("No {what}s found.");
        return;
    }
    for name in names {
        println!("{name}");
    }
    println!("\n{} {what}(s)", names.len());
}

fn print_domain(domain: &MailDomain) {
    println!("Name:       {}", domain.name);
    println!("Path:       {}", domain.path);
    println!("Enabled:    {}", domain.enabled);
    println!(
        "Size:       {} / {} MB",
        domain.size_mb, domain.max_domain_size_mb
    );
    println!("Catch-all:  {}", or_dash(&domain.catch_all_account));
    println!(
        "License:    {}",
        domain.license.map_or("-", LicenseEdition::as_str)
    );

    println!("\n--- Limits ---");
    println!("Users:          {}", domain.max_domain_users);
    println!("Aliases:        {}", domain.max_aliases);
    println!("Domain aliases: {}", domain.max_domain_aliases);
    println!("Lists:          {}", domain.max_lists);
    println!("Mailbox size:   {} MB", domain.max_mailbox_size_mb);
    println!("Message size:   {}", domain.max_message_size);
    println!("Recipients:     {}", domain.max_recipients);

    let throttle = &domain.throttle;
    println!("\n--- Throttling (per hour) ---");
    println!(
        "Messages:  {} ({})",
        throttle.messages_per_hour,
        on_off(throttle.messages_enabled)
    );
    println!(
        "Bandwidth: {} ({})",
        throttle.bandwidth_per_hour,
        on_off(throttle.bandwidth_enabled)
    );
    println!(
        "Bounces:   {} ({})",
        throttle.bounces_per_hour,
        on_off(throttle.bounces_enabled)
    );
}

fn print_accounts(accounts: &[MailAccount]) {
    if accounts.is_empty() {
        println!("No mailboxes found.");
        return;
    }

    println!("{:<40} {:>12}", "Mailbox", "Size (MB)");
    println!("{}", "-".repeat(53));
    for account in accounts {
        println!(
            "{:<40} {:>12}",
            truncate(&account.name, 38),
            smartermail_provider::bytes_to_mb(account.size_bytes)
        );
    }
    println!("\n{} mailbox(es)", accounts.len());
}

fn print_account(account: &MailAccount) {
    println!("Name:      {}", account.name);
    println!("Full name: {}", or_dash(&account.display_name()));
    println!("Enabled:   {}", account.enabled);
    println!("Admin:     {}", account.is_domain_admin);
    println!("Quota:     {} MB", account.max_mailbox_size_mb);
    println!("Reply-To:  {}", or_dash(&account.reply_to));

    if account.forwarding_enabled || !account.forwarding_addresses.is_empty() {
        println!("\n--- Forwarding ---");
        for address in &account.forwarding_addresses {
            println!("  {address}");
        }
        if account.delete_on_forward {
            println!("  (delete on forward)");
        }
    }

    if account.responder_enabled {
        println!("\n--- Auto-responder ---");
        println!("Subject: {}", account.responder_subject);
        println!("{}", account.responder_message);
    }

    if let Some(signature) = &account.signature {
        println!("\n--- Signature ---");
        println!("{signature}");
    }
}

fn print_aliases(aliases: &[MailAlias]) {
    if aliases.is_empty() {
        println!("No aliases found.");
        return;
    }
    for alias in aliases {
        println!("{:<40} -> {}", alias.name, alias.forward_to);
    }
    println!("\n{} alias(es)", aliases.len());
}

fn print_groups(groups: &[MailGroup]) {
    if groups.is_empty() {
        println!("No groups found.");
        return;
    }
    for group in groups {
        println!("{}", group.name);
        for member in &group.members {
            println!("  {member}");
        }
    }
    println!("\n{} group(s)", groups.len());
}

fn print_lists(lists: &[MailList]) {
    if lists.is_empty() {
        println!("No mailing lists found.");
        return;
    }

    println!("{:<40} {:>8} {}", "List", "Members", "Description");
    println!("{}", "-".repeat(80));
    for list in lists {
        println!(
            "{:<40} {:>8} {}",
            truncate(&list.name, 38),
            list.members.len(),
            truncate(&list.description, 30)
        );
    }
    println!("\n{} list(s)", lists.len());
}

fn print_list(list: &MailList) {
    println!("Name:        {}", list.name);
    println!("Id:          {}", list.id);
    println!(
        "Created:     {}",
        list.created
            .map_or_else(|| "-".to_string(), |c| c.format("%Y-%m-%d %H:%M").to_string())
    );
    println!("Description: {}", or_dash(&list.description));
    println!("Moderator:   {}", or_dash(&list.moderator_address));
    println!("Posting:     {:?}", list.posting_mode);
    println!("Digest:      {}", list.digest_mode);

    println!("\n--- Members ---");
    for member in &list.members {
        println!("  {member}");
    }
    println!("\n{} member(s)", list.members.len());
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
