//! Interactive shell - reads commands from stdin and drives the services.
//!
//! The shell is thin plumbing: it parses arguments, renders messages and
//! leaves every decision to the service layer.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

use finch_core::domain::{LocalFile, Post, PostId, UserId};
use finch_core::ports::Confirmer;
use finch_core::service::{
    LiveFeed, PostComposer, PostEditor, PostRemover, ProfileEditor, SessionGate, SubmitOutcome,
};
use finch_core::Backend;

/// One shared stdin reader. The shell and the delete confirmer both
/// prompt through it, so reads never interleave.
#[derive(Clone)]
struct LineReader {
    input: Arc<Mutex<BufReader<Stdin>>>,
}

impl LineReader {
    fn new() -> Self {
        Self {
            input: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()))),
        }
    }

    /// Read one line, trimmed. `None` on end of input.
    async fn line(&self) -> Option<String> {
        let mut buf = String::new();
        let n = self.input.lock().await.read_line(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        Some(buf.trim().to_string())
    }

    async fn prompt(&self, text: &str) -> Option<String> {
        flush_prompt(text);
        self.line().await
    }
}

fn flush_prompt(text: &str) {
    use std::io::Write;
    print!("{text}");
    let _ = std::io::stdout().flush();
}

/// Confirmer that asks on the shared stdin. Anything but y / yes declines.
struct StdinConfirmer {
    reader: LineReader,
}

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        match self.reader.prompt(&format!("{prompt} [y/N] ")).await {
            Some(answer) => matches!(answer.to_lowercase().as_str(), "y" | "yes"),
            None => false,
        }
    }
}

pub struct Shell {
    backend: Backend,
    gate: SessionGate,
    reader: LineReader,
}

impl Shell {
    pub fn new(backend: Backend) -> Self {
        let gate = SessionGate::new(&backend);
        Self {
            backend,
            gate,
            reader: LineReader::new(),
        }
    }

    pub async fn run(self) -> Result<()> {
        println!("finch - type 'help' for commands");
        loop {
            let Some(line) = self.reader.prompt("> ").await else {
                break;
            };
            if line.is_empty() {
                continue;
            }
            let (command, rest) = split_command(&line);
            match command {
                "help" => print_help(),
                "quit" | "exit" => break,
                "signup" => self.signup().await,
                "login" => self.login().await,
                "logout" => self.logout().await,
                "whoami" => self.whoami().await,
                "post" => self.post(rest).await,
                "feed" => self.feed(rest.trim() == "--mine").await,
                "watch" => self.watch(rest.trim() == "--mine").await,
                "edit" => self.edit(rest).await,
                "delete" => self.delete(rest).await,
                "name" => self.rename(rest).await,
                "avatar" => self.avatar(rest).await,
                other => println!("Unknown command '{other}'; try 'help'"),
            }
        }
        Ok(())
    }

    fn confirmer(&self) -> StdinConfirmer {
        StdinConfirmer {
            reader: self.reader.clone(),
        }
    }

    async fn signup(&self) {
        let Some(name) = self.reader.prompt("display name: ").await else {
            return;
        };
        let Some(email) = self.reader.prompt("email: ").await else {
            return;
        };
        let Some(password) = self.reader.prompt("password: ").await else {
            return;
        };
        match self.gate.sign_up(&name, &email, &password).await {
            Ok(session) => println!("Welcome, {}", session.author_name()),
            Err(e) => println!("{e}"),
        }
    }

    async fn login(&self) {
        let Some(email) = self.reader.prompt("email: ").await else {
            return;
        };
        let Some(password) = self.reader.prompt("password: ").await else {
            return;
        };
        match self.gate.sign_in(&email, &password).await {
            Ok(session) => println!("Welcome back, {}", session.author_name()),
            Err(e) => println!("{e}"),
        }
    }

    async fn logout(&self) {
        if !self.gate.is_authenticated().await {
            println!("Not signed in");
            return;
        }
        if !self.confirmer().confirm("Sign out?").await {
            println!("Staying signed in");
            return;
        }
        match self.gate.sign_out().await {
            Ok(()) => println!("Signed out"),
            Err(e) => println!("{e}"),
        }
    }

    async fn whoami(&self) {
        match self.gate.current().await {
            Some(session) => {
                println!("{} <{}>", session.author_name(), session.email);
                if let Some(url) = &session.avatar_url {
                    println!("avatar: {url}");
                }
            }
            None => println!("Not signed in"),
        }
    }

    async fn post(&self, rest: &str) {
        let (text, photo_path) = match rest.split_once("--photo") {
            Some((text, path)) => (text.trim(), Some(path.trim())),
            None => (rest.trim(), None),
        };
        let photo = match photo_path {
            Some(path) => match read_local_file(path).await {
                Ok(file) => Some(file),
                Err(e) => {
                    println!("Could not read {path}: {e}");
                    return;
                }
            },
            None => None,
        };

        let composer = PostComposer::new(self.backend.clone());
        match composer.compose(text, photo).await {
            Ok(id) => println!("Posted {id}"),
            Err(e) => println!("{e}"),
        }
    }

    /// Resolve `--mine` to an author filter. `None` aborts the command.
    async fn feed_scope(&self, mine: bool) -> Option<Option<UserId>> {
        if !mine {
            return Some(None);
        }
        match self.gate.current().await {
            Some(session) => Some(Some(session.user_id)),
            None => {
                println!("Sign in to use --mine");
                None
            }
        }
    }

    async fn feed(&self, mine: bool) {
        let Some(author) = self.feed_scope(mine).await else {
            return;
        };
        match LiveFeed::new(self.backend.clone())
            .subscribe(author.as_ref())
            .await
        {
            Ok(mut feed) => {
                if feed.changed().await {
                    print_posts(&feed.posts());
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    async fn watch(&self, mine: bool) {
        let Some(author) = self.feed_scope(mine).await else {
            return;
        };
        let mut feed = match LiveFeed::new(self.backend.clone())
            .subscribe(author.as_ref())
            .await
        {
            Ok(feed) => feed,
            Err(e) => {
                println!("{e}");
                return;
            }
        };

        println!("Watching; press Enter to stop");
        loop {
            tokio::select! {
                changed = feed.changed() => {
                    if !changed {
                        break;
                    }
                    print_posts(&feed.posts());
                }
                _ = self.reader.line() => break,
            }
        }
    }

    /// Fetch the current feed page once and look a post up by id.
    async fn find_post(&self, id: &str) -> Option<Post> {
        let mut feed = match LiveFeed::new(self.backend.clone()).subscribe(None).await {
            Ok(feed) => feed,
            Err(e) => {
                println!("{e}");
                return None;
            }
        };
        if !feed.changed().await {
            return None;
        }
        let found = feed.posts().into_iter().find(|p| p.id == PostId::from(id));
        if found.is_none() {
            println!("No post {id} in the current page");
        }
        found
    }

    async fn edit(&self, rest: &str) {
        let id = rest.trim();
        if id.is_empty() {
            println!("Usage: edit <id>");
            return;
        }
        let Some(post) = self.find_post(id).await else {
            return;
        };

        let mut editor = PostEditor::open(self.backend.clone(), post);
        println!("Editing {id}: text <t> | photo <path> | remove | restore | show | save | cancel");
        loop {
            let Some(line) = self.reader.prompt("edit> ").await else {
                return;
            };
            let (command, args) = split_command(&line);
            match command {
                "text" => editor.set_text(args.trim()),
                "photo" => match read_local_file(args.trim()).await {
                    Ok(file) => editor.select_photo(file),
                    Err(e) => println!("Could not read {}: {e}", args.trim()),
                },
                "remove" => editor.remove_photo(),
                "restore" => editor.restore_photo(),
                "show" => {
                    let draft = editor.draft();
                    println!("text: {}", draft.text());
                    match draft.displayed_photo() {
                        Some(url) => println!("photo: {url}"),
                        None => println!("photo: none"),
                    }
                }
                "save" => match editor.submit().await {
                    Ok(SubmitOutcome::Updated) => {
                        println!("Saved");
                        return;
                    }
                    Ok(SubmitOutcome::NoChange) => {
                        println!("Nothing to save");
                        return;
                    }
                    // The draft survives a failed submit; stay in the
                    // editor so it can be fixed and resubmitted.
                    Err(e) => println!("{e}"),
                },
                "cancel" => return,
                "" => {}
                other => println!("Unknown edit command '{other}'"),
            }
        }
    }

    async fn delete(&self, rest: &str) {
        let id = rest.trim();
        if id.is_empty() {
            println!("Usage: delete <id>");
            return;
        }
        let Some(post) = self.find_post(id).await else {
            return;
        };

        let remover = PostRemover::new(self.backend.clone());
        match remover.delete(&self.confirmer(), &post).await {
            Ok(true) => println!("Deleted {id}"),
            Ok(false) => println!("Kept {id}"),
            Err(e) => println!("{e}"),
        }
    }

    async fn rename(&self, rest: &str) {
        let profile = ProfileEditor::new(self.backend.clone());
        match profile.rename(rest.trim()).await {
            Ok(session) => println!("You are now {}", session.author_name()),
            Err(e) => println!("{e}"),
        }
    }

    async fn avatar(&self, rest: &str) {
        let path = rest.trim();
        if path.is_empty() {
            println!("Usage: avatar <path>");
            return;
        }
        let file = match read_local_file(path).await {
            Ok(file) => file,
            Err(e) => {
                println!("Could not read {path}: {e}");
                return;
            }
        };

        let profile = ProfileEditor::new(self.backend.clone());
        match profile.set_avatar(file).await {
            Ok(session) => println!("Avatar set: {}", session.avatar_url.unwrap_or_default()),
            Err(e) => println!("{e}"),
        }
    }
}

fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim_start()),
        None => (line, ""),
    }
}

/// Read a file into a `LocalFile`, inferring the content type from the
/// extension.
async fn read_local_file(path: &str) -> std::io::Result<LocalFile> {
    let bytes = tokio::fs::read(path).await?;
    let name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    Ok(LocalFile::new(name, content_type_for(path), bytes))
}

fn content_type_for(path: &str) -> &'static str {
    match std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn print_posts(posts: &[Post]) {
    if posts.is_empty() {
        println!("(no posts yet)");
        return;
    }
    for post in posts {
        let when = chrono::DateTime::from_timestamp_millis(post.created_at)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| post.created_at.to_string());

        let mut line = format!(
            "[{}] {} at {}: {}",
            post.id, post.author_name, when, post.text
        );
        if post.photo_url.is_some() {
            line.push_str(" [photo]");
        }
        if post.updated_at.is_some() {
            line.push_str(" (edited)");
        }
        println!("{line}");
    }
}

fn print_help() {
    println!(
        "\
Commands:
  signup                      create an account and sign in
  login                       sign in
  logout                      sign out (asks first)
  whoami                      show the signed-in user
  post <text> [--photo <p>]   create a post, optionally with a photo
  feed [--mine]               print the current feed page
  watch [--mine]              stream feed updates until Enter
  edit <id>                   edit a post interactively
  delete <id>                 delete a post (asks first)
  name <new name>             change your display name
  avatar <path>               upload a new avatar
  help                        this text
  quit                        leave"
    );
}
