use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use client_core::{
    attachments::StagedAttachment,
    render::{MessageView, StagedAttachmentView, ThreadCardView},
    ClientEvent, Composer, NewThread, PortalClient, PortalSession, ThreadFilter, VoiceClip,
};
use shared::domain::{StatusTarget, ThreadId, ThreadKind, UserId, ViewerRole};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use uuid::Uuid;

mod config;

#[derive(Parser, Debug)]
struct Args {
    /// Portal base URL; overrides portal.toml and environment.
    #[arg(long)]
    server_url: Option<String>,
    /// Session CSRF token for mutating calls.
    #[arg(long)]
    csrf_token: Option<String>,
    /// Signed-in user id (UUID).
    #[arg(long)]
    user_id: Option<String>,
    /// Viewer role: admin, cs_rep, teacher, or student.
    #[arg(long)]
    role: Option<String>,
}

fn parse_role(raw: &str) -> Result<ViewerRole> {
    match raw {
        "admin" => Ok(ViewerRole::Admin),
        "cs_rep" => Ok(ViewerRole::CsRep),
        "teacher" => Ok(ViewerRole::Teacher),
        "student" => Ok(ViewerRole::Student),
        other => Err(anyhow!("unknown role: {other}")),
    }
}

fn print_card(index: usize, card: &ThreadCardView) {
    let badge = if card.show_new_badge { " [NEW]" } else { "" };
    println!(
        "{index:>3}. [{}] [{}]{badge} {}",
        card.kind_label, card.status_label, card.subject
    );
    println!("      {}", card.preview);
    println!("      with: {}", card.participant_line);
    if let Some(line) = &card.assignment_line {
        println!("      {line}");
    }
    println!("      by {} at {}", card.created_by, card.updated_label);
}

fn print_message(view: &MessageView) {
    let marker = match view.alignment {
        client_core::render::MessageAlignment::Viewer => ">>",
        client_core::render::MessageAlignment::Other => "<<",
        client_core::render::MessageAlignment::System => "--",
    };
    let mut text = String::new();
    for segment in &view.segments {
        match segment {
            client_core::render::MessageSegment::Text(t) => text.push_str(t),
            client_core::render::MessageSegment::Mention(name) => {
                text.push('@');
                text.push_str(name);
            }
        }
    }
    println!("{marker} {} [{}] {text}", view.sender_line, view.time_label);
    for attachment in &view.attachments {
        match attachment {
            client_core::render::AttachmentView::File { name, url } => {
                println!("     file: {name} ({url})");
            }
            client_core::render::AttachmentView::Voice { url, label } => {
                println!("     {label} ({url})");
            }
        }
    }
}

fn spawn_event_printer(client: &Arc<PortalClient>, viewer_id: UserId) {
    let mut rx = client.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                ClientEvent::ThreadListReplaced { threads } => {
                    println!("(thread list updated: {} threads; run 'list')", threads.len());
                }
                ClientEvent::MessageAppended { message, .. } => {
                    print_message(&MessageView::from_message(&message, viewer_id));
                }
                ClientEvent::ParticipantTyping {
                    user_name,
                    is_typing,
                    ..
                } => {
                    if is_typing {
                        println!("({user_name} is typing...)");
                    }
                }
                ClientEvent::StatusChanged { status, .. } => {
                    println!("(thread is now {status})");
                }
                ClientEvent::ThreadDeleted { thread_id } => {
                    println!("(thread {thread_id} deleted)");
                }
                ClientEvent::ThreadCreated { thread_id } => match thread_id {
                    Some(id) => println!("(thread {id} created)"),
                    None => println!("(thread created)"),
                },
                ClientEvent::Error(message) => {
                    eprintln!("error: {message}");
                }
                ClientEvent::ThreadOpened { .. } | ClientEvent::ThreadClosed { .. } => {}
            }
        }
    });
}

struct Shell {
    client: Arc<PortalClient>,
    viewer_id: UserId,
    last_list: Vec<ThreadId>,
    open: Option<(ThreadId, Composer)>,
}

impl Shell {
    async fn print_list(&mut self) {
        let threads = self.client.thread_list().await;
        if threads.is_empty() {
            println!("no threads");
        }
        self.last_list = threads.iter().map(|t| t.id).collect();
        for (index, thread) in threads.iter().enumerate() {
            print_card(index + 1, &ThreadCardView::from_summary(thread));
        }
    }

    fn resolve_thread_arg(&self, arg: &str) -> Result<ThreadId> {
        if let Ok(index) = arg.parse::<usize>() {
            return self
                .last_list
                .get(index.checked_sub(1).unwrap_or(usize::MAX))
                .copied()
                .ok_or_else(|| anyhow!("no thread at index {index}; run 'list' first"));
        }
        Ok(ThreadId(Uuid::parse_str(arg).context("not an index or a thread id")?))
    }

    fn open_thread_id(&self) -> Result<ThreadId> {
        self.open
            .as_ref()
            .map(|(id, _)| *id)
            .ok_or_else(|| anyhow!("no thread open; use 'open <n>'"))
    }

    async fn open(&mut self, arg: &str) -> Result<()> {
        let thread_id = self.resolve_thread_arg(arg)?;
        self.client.open_thread(thread_id).await?;
        let Some(snapshot) = self.client.open_thread_snapshot().await else {
            println!("thread not opened (unknown id?)");
            return Ok(());
        };
        println!(
            "opened thread {} ({} participants, {})",
            snapshot.thread_id,
            snapshot.participants.len(),
            snapshot.status
        );
        for message in &snapshot.messages {
            print_message(&MessageView::from_message(message, self.viewer_id));
        }
        let composer = Composer::new(snapshot.participants.clone(), snapshot.status);
        if !composer.is_enabled() {
            println!("(thread is {}; composer disabled)", snapshot.status);
        }
        self.open = Some((snapshot.thread_id, composer));
        Ok(())
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        let thread_id = self.open_thread_id()?;
        let (_, composer) = self.open.as_mut().ok_or_else(|| anyhow!("no thread open"))?;
        if !text.is_empty() {
            composer.set_draft(text);
        }
        let outgoing = composer.prepare_send()?;
        if self.client.send_message(thread_id, outgoing).await? {
            let (_, composer) = self.open.as_mut().ok_or_else(|| anyhow!("no thread open"))?;
            composer.clear_after_send();
        } else {
            println!("(a send is already in progress)");
        }
        Ok(())
    }

    async fn attach(&mut self, path: &str) -> Result<()> {
        let (_, composer) = self.open.as_mut().ok_or_else(|| anyhow!("no thread open"))?;
        let data = tokio::fs::read(path).await.context("read attachment")?;
        let name = std::path::Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let last_modified = tokio::fs::metadata(path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        composer.stager.begin_pick();
        composer
            .stager
            .finish_pick(vec![StagedAttachment::file(name, last_modified, data)]);
        self.print_staged();
        Ok(())
    }

    fn print_staged(&self) {
        let Some((_, composer)) = self.open.as_ref() else {
            return;
        };
        if composer.stager.is_empty() {
            println!("no staged attachments");
            return;
        }
        for (index, staged) in composer.stager.staged().iter().enumerate() {
            let view = StagedAttachmentView::from_staged(staged);
            println!("{:>3}. {} ({})", index + 1, view.name, view.size_label);
        }
    }

    async fn voice(&mut self, path: &str, duration_ms: u64) -> Result<()> {
        let thread_id = self.open_thread_id()?;
        let bytes = tokio::fs::read(path).await.context("read clip")?;
        let clip = VoiceClip {
            bytes,
            duration: Duration::from_millis(duration_ms),
        };
        if self.client.send_voicemail(thread_id, clip).await? {
            println!("voicemail sent");
        } else {
            println!("(a voicemail upload is already in progress)");
        }
        Ok(())
    }

    fn suggest(&self) {
        let Some((_, composer)) = self.open.as_ref() else {
            println!("no thread open");
            return;
        };
        let suggestions = composer.mention_suggestions();
        if suggestions.is_empty() {
            println!("no matches");
        }
        for participant in suggestions {
            println!("@{} ({})", participant.display_name, participant.role);
        }
    }

    fn mention(&mut self, name: &str) -> Result<()> {
        let (_, composer) = self.open.as_mut().ok_or_else(|| anyhow!("no thread open"))?;
        let query = composer
            .mention_query()
            .ok_or_else(|| anyhow!("no active @query in the draft"))?;
        composer.apply_mention(&query, name);
        println!("draft: {}", composer.draft());
        Ok(())
    }
}

fn print_help() {
    println!("commands:");
    println!("  list [all|active|resolved|closed|assignment|invoice|general|support]");
    println!("  open <n|thread-id>      close");
    println!("  draft <text>            suggest            mention <Display Name>");
    println!("  send [text]             attach <path>      unattach <n>   files   clearfiles");
    println!("  voice <path> <ms>       status <resolved|closed>          delete");
    println!("  create <type> <subject> recipients         assignments [student-id]   invoices");
    println!("  help                    quit");
}

async fn run_command(
    shell: &mut Shell,
    lines: &mut Lines<BufReader<Stdin>>,
    line: &str,
) -> Result<bool> {
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "help" => print_help(),
        "quit" | "exit" => return Ok(true),
        "list" => {
            if !rest.is_empty() {
                let filter = ThreadFilter::parse(rest)
                    .ok_or_else(|| anyhow!("unknown filter: {rest}"))?;
                shell.client.refresh_threads(filter).await?;
            }
            shell.print_list().await;
        }
        "open" => shell.open(rest).await?,
        "close" => {
            shell.client.close_thread().await;
            shell.open = None;
            println!("thread closed");
        }
        "draft" => {
            let (_, composer) = shell
                .open
                .as_mut()
                .ok_or_else(|| anyhow!("no thread open"))?;
            composer.set_draft(rest);
            println!("draft: {}", composer.draft());
        }
        "suggest" => shell.suggest(),
        "mention" => shell.mention(rest)?,
        "send" => shell.send(rest).await?,
        "attach" => shell.attach(rest).await?,
        "files" => shell.print_staged(),
        "unattach" => {
            let index: usize = rest.parse().context("unattach <n>")?;
            let (_, composer) = shell
                .open
                .as_mut()
                .ok_or_else(|| anyhow!("no thread open"))?;
            composer.stager.remove_at(index.saturating_sub(1));
            shell.print_staged();
        }
        "clearfiles" => {
            let (_, composer) = shell
                .open
                .as_mut()
                .ok_or_else(|| anyhow!("no thread open"))?;
            composer.stager.clear_all();
            println!("staged attachments cleared");
        }
        "voice" => {
            let mut args = rest.split_whitespace();
            let path = args.next().ok_or_else(|| anyhow!("voice <path> <ms>"))?;
            let duration_ms: u64 = args
                .next()
                .ok_or_else(|| anyhow!("voice <path> <ms>"))?
                .parse()
                .context("duration in milliseconds")?;
            shell.voice(path, duration_ms).await?;
        }
        "status" => {
            let thread_id = shell.open_thread_id()?;
            let target = match rest {
                "resolved" => StatusTarget::Resolved,
                "closed" => StatusTarget::Closed,
                other => return Err(anyhow!("unknown status target: {other}")),
            };
            shell.client.update_status(thread_id, target).await?;
            if let Some(snapshot) = shell.client.open_thread_snapshot().await {
                if let Some((_, composer)) = shell.open.as_mut() {
                    composer.set_status(snapshot.status);
                }
            }
        }
        "delete" => {
            let thread_id = shell.open_thread_id()?;
            println!("Delete this thread? This cannot be undone. [y/N]");
            let confirmation = lines.next_line().await?.unwrap_or_default();
            if confirmation.trim().eq_ignore_ascii_case("y") {
                shell.client.delete_thread(thread_id).await?;
                shell.open = None;
            } else {
                println!("delete cancelled");
            }
        }
        "create" => {
            let mut args = rest.splitn(2, ' ');
            let kind = match args.next().unwrap_or_default() {
                "assignment" => ThreadKind::Assignment,
                "invoice" => ThreadKind::Invoice,
                "general" => ThreadKind::General,
                "support" => ThreadKind::Support,
                other => return Err(anyhow!("unknown thread type: {other}")),
            };
            let subject = args.next().unwrap_or("").trim().to_string();
            if subject.is_empty() {
                return Err(anyhow!("create <type> <subject>"));
            }
            println!("initial message:");
            let initial_message = lines.next_line().await?.unwrap_or_default();
            println!("recipient ids (comma separated):");
            let raw_recipients = lines.next_line().await?.unwrap_or_default();
            let mut recipients = Vec::new();
            for raw in raw_recipients.split(',').map(str::trim) {
                if raw.is_empty() {
                    continue;
                }
                recipients.push(UserId(Uuid::parse_str(raw).context("recipient id")?));
            }
            shell
                .client
                .create_thread(NewThread {
                    subject,
                    kind,
                    initial_message,
                    recipients,
                    assignment_id: None,
                    invoice_id: None,
                })
                .await?;
        }
        "recipients" => {
            for user in shell.client.list_recipient_candidates().await? {
                println!("{} {} ({})", user.id, user.name, user.role);
            }
        }
        "assignments" => {
            let student = if rest.is_empty() {
                None
            } else {
                Some(UserId(Uuid::parse_str(rest).context("student id")?))
            };
            for assignment in shell.client.list_assignments(student).await? {
                println!("{} {} - {}", assignment.id, assignment.assignment_code, assignment.title);
            }
        }
        "invoices" => {
            for invoice in shell.client.list_invoices().await? {
                println!("{} ${} ({})", invoice.id, invoice.amount, invoice.status);
            }
        }
        "" => {}
        other => println!("unknown command: {other} (try 'help')"),
    }
    Ok(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let mut settings = config::load_settings();
    if let Some(v) = args.server_url {
        settings.server_url = v;
    }
    if let Some(v) = args.csrf_token {
        settings.csrf_token = Some(v);
    }
    if let Some(v) = args.user_id {
        settings.user_id = Some(v);
    }
    if let Some(v) = args.role {
        settings.role = v;
    }

    let viewer_id = UserId(
        Uuid::parse_str(
            settings
                .user_id
                .as_deref()
                .ok_or_else(|| anyhow!("user_id is required (flag, portal.toml, or PORTAL_USER_ID)"))?,
        )
        .context("user_id must be a UUID")?,
    );
    let viewer_role = parse_role(&settings.role)?;

    let client = PortalClient::new();
    client
        .connect(PortalSession {
            server_url: settings.server_url.trim_end_matches('/').to_string(),
            csrf_token: settings.csrf_token,
            viewer_id,
            viewer_role,
        })
        .await?;
    spawn_event_printer(&client, viewer_id);
    tracing::info!(server_url = %settings.server_url, role = ?viewer_role, "session connected");

    println!("connected; type 'help' for commands");
    let mut shell = Shell {
        client: Arc::clone(&client),
        viewer_id,
        last_list: Vec::new(),
        open: None,
    };
    shell.print_list().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match run_command(&mut shell, &mut lines, line.trim()).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => eprintln!("error: {err}"),
        }
    }

    client.shutdown().await;
    Ok(())
}
