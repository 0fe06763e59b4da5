use std::fmt::Write as _;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use time::OffsetDateTime;

use crate::app::App;
use crate::config::AppConfig;
use crate::notes::legacy::{LegacyNote, LegacyNotepad};
use crate::notes::{dates, markup, NoteRepository};
use crate::richtext::{to_markup, Document};
use crate::search::build_entries;

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the note (prompted on a terminal if omitted)
    #[arg()]
    pub title: Option<String>,
    /// Provide the note body inline. If omitted, reads piped stdin.
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only show notes whose title or content contains this text
    #[arg()]
    pub query: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Note identifier
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note identifier
    pub id: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum LegacyCommand {
    /// Print the stored title and content
    Show,
    /// Overwrite the stored title and content
    Save(LegacySaveArgs),
    /// Forget the stored note
    Clear,
}

#[derive(Args, Debug, Clone)]
pub struct LegacySaveArgs {
    #[arg(long, default_value = "")]
    pub title: String,
    #[arg(long, default_value = "")]
    pub content: String,
}

#[derive(Args, Debug, Clone)]
pub struct LegacyArgs {
    #[command(subcommand)]
    pub command: LegacyCommand,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn new_note(mut repo: NoteRepository, args: NewArgs) -> Result<()> {
    let title = match args.title {
        Some(title) => title,
        None if atty::is(atty::Stream::Stdin) => prompt("Title")?,
        None => String::new(),
    };
    let content = match args.content {
        Some(content) => content,
        None => read_stdin()?.unwrap_or_default(),
    };

    let id = create_note(&mut repo, &title, &content, OffsetDateTime::now_utc())?;
    let title = repo.get(&id).map(|note| note.display_title()).unwrap_or_default();
    println!("Created note {id} ({title})");
    Ok(())
}

/// Creates a note and fills it in. `content` is plain text, one paragraph
/// per line.
fn create_note(
    repo: &mut NoteRepository,
    title: &str,
    content: &str,
    now: OffsetDateTime,
) -> Result<String> {
    repo.load_all().context("loading notes")?;
    let id = repo.create(now).context("creating note")?;
    let markup = to_markup(&Document::from_plain_text(content));
    repo.update(&id, title.trim(), &markup, now)
        .with_context(|| format!("writing note {id}"))?;
    Ok(id)
}

pub fn list_notes(config: &AppConfig, mut repo: NoteRepository, args: ListArgs) -> Result<()> {
    repo.load_all().context("loading notes")?;
    let output = format_list(&repo, &args.query.join(" "), config.list.preview_chars);
    print!("{output}");
    Ok(())
}

fn format_list(repo: &NoteRepository, query: &str, preview_chars: usize) -> String {
    let entries = build_entries(repo.notes(), query.trim(), preview_chars, None);
    if entries.is_empty() {
        return if repo.is_empty() {
            "No notes yet.\n".to_string()
        } else {
            "No matches found.\n".to_string()
        };
    }
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(&mut out, "{}  {}  {}", entry.id, entry.date_label, entry.title);
        if !entry.preview.trim().is_empty() {
            let _ = writeln!(&mut out, "    {}", entry.preview.trim());
        }
    }
    out
}

pub fn show_note(mut repo: NoteRepository, args: ShowArgs) -> Result<()> {
    repo.load_all().context("loading notes")?;
    print!("{}", format_note(&repo, &args.id)?);
    Ok(())
}

fn format_note(repo: &NoteRepository, id: &str) -> Result<String> {
    let Some(note) = repo.get(id) else {
        bail!("note {id} not found");
    };
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", note.display_title());
    let _ = writeln!(
        &mut out,
        "Last modified: {}",
        dates::datetime_label(&note.last_modified)
    );
    out.push('\n');
    let body = markup::plain_text(&note.content);
    if !body.is_empty() {
        let _ = writeln!(&mut out, "{body}");
        out.push('\n');
    }
    let _ = writeln!(&mut out, "{} words", markup::word_count(&note.content));
    Ok(out)
}

pub fn delete_note(mut repo: NoteRepository, args: DeleteArgs) -> Result<()> {
    remove_note(&mut repo, &args.id)?;
    println!("Deleted note {}", args.id);
    Ok(())
}

fn remove_note(repo: &mut NoteRepository, id: &str) -> Result<()> {
    repo.load_all().context("loading notes")?;
    if !repo
        .delete(id)
        .with_context(|| format!("deleting note {id}"))?
    {
        bail!("note {id} not found");
    }
    Ok(())
}

pub fn handle_legacy_command(repo: NoteRepository, args: LegacyArgs) -> Result<()> {
    let notepad = LegacyNotepad::new(repo.store());
    match args.command {
        LegacyCommand::Show => {
            let note = notepad.load().context("reading legacy note")?;
            print!("{}", format_legacy(&note));
        }
        LegacyCommand::Save(args) => {
            notepad
                .save(&LegacyNote {
                    title: args.title,
                    content: args.content,
                })
                .context("saving legacy note")?;
            println!("Legacy note saved");
        }
        LegacyCommand::Clear => {
            notepad.clear().context("clearing legacy note")?;
            println!("Legacy note cleared");
        }
    }
    Ok(())
}

fn format_legacy(note: &LegacyNote) -> String {
    if note.is_empty() {
        return "(empty)\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", note.title);
    out.push('\n');
    let _ = writeln!(&mut out, "{}", markup::plain_text(&note.content));
    out
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::DEFAULT_TITLE;
    use crate::store::LocalFileStore;
    use tempfile::TempDir;
    use time::macros::datetime;

    type TestResult<T = ()> = Result<T>;

    fn open_repo(temp: &TempDir) -> TestResult<NoteRepository> {
        let store = LocalFileStore::open(&temp.path().join("notes.json"))?;
        Ok(NoteRepository::new(Box::new(store)))
    }

    #[test]
    fn cli_new_converts_plain_text_to_markup() -> TestResult {
        let temp = TempDir::new().context("creating temp dir")?;
        let mut repo = open_repo(&temp)?;
        let id = create_note(
            &mut repo,
            "  Groceries ",
            "milk & eggs\nbread",
            datetime!(2024-03-05 12:00 UTC),
        )?;

        let mut reloaded = open_repo(&temp)?;
        reloaded.load_all()?;
        let note = reloaded.get(&id).expect("note persisted");
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "<p>milk &amp; eggs</p><p>bread</p>");
        assert_eq!(note.last_modified, "2024-03-05T12:00:00.000Z");
        Ok(())
    }

    #[test]
    fn cli_new_keeps_angle_brackets_as_text() -> TestResult {
        let temp = TempDir::new().context("creating temp dir")?;
        let mut repo = open_repo(&temp)?;
        let id = create_note(
            &mut repo,
            "Rust",
            "use Vec<String> or <b>x</b>",
            datetime!(2024-03-05 12:00 UTC),
        )?;

        let note = repo.get(&id).expect("note created");
        assert_eq!(
            note.content,
            "<p>use Vec&lt;String&gt; or &lt;b&gt;x&lt;/b&gt;</p>"
        );
        assert_eq!(
            markup::plain_text(&note.content),
            "use Vec<String> or <b>x</b>"
        );
        Ok(())
    }

    #[test]
    fn cli_new_without_title_uses_default() -> TestResult {
        let temp = TempDir::new().context("creating temp dir")?;
        let mut repo = open_repo(&temp)?;
        let id = create_note(&mut repo, "", "", datetime!(2024-03-05 12:00 UTC))?;
        assert_eq!(repo.get(&id).map(|n| n.title.as_str()), Some(DEFAULT_TITLE));
        assert_eq!(repo.get(&id).map(|n| n.content.as_str()), Some(""));
        Ok(())
    }

    #[test]
    fn cli_list_filters_and_reports_no_matches() -> TestResult {
        let temp = TempDir::new().context("creating temp dir")?;
        let mut repo = open_repo(&temp)?;
        assert_eq!(format_list(&repo, "", 100), "No notes yet.\n");

        let now = datetime!(2024-03-05 12:00 UTC);
        create_note(&mut repo, "Groceries", "milk", now)?;
        create_note(&mut repo, "Work", "Discuss Q3", now)?;

        let output = format_list(&repo, "gro", 100);
        assert!(output.contains("Groceries"));
        assert!(output.contains("    milk"));
        assert!(!output.contains("Work"));
        assert_eq!(format_list(&repo, "zzz", 100), "No matches found.\n");
        Ok(())
    }

    #[test]
    fn cli_show_prints_plain_text_and_word_count() -> TestResult {
        let temp = TempDir::new().context("creating temp dir")?;
        let mut repo = open_repo(&temp)?;
        let id = create_note(
            &mut repo,
            "Meeting Notes",
            "Discuss Q3",
            datetime!(2024-03-05 12:00 UTC),
        )?;

        let output = format_note(&repo, &id)?;
        assert!(output.starts_with("Meeting Notes\nLast modified: "));
        assert!(output.contains("\nDiscuss Q3\n"));
        assert!(output.ends_with("2 words\n"));
        assert!(format_note(&repo, "missing").is_err());
        Ok(())
    }

    #[test]
    fn cli_delete_removes_persisted_note() -> TestResult {
        let temp = TempDir::new().context("creating temp dir")?;
        let mut repo = open_repo(&temp)?;
        let id = create_note(&mut repo, "Doomed", "", datetime!(2024-03-05 12:00 UTC))?;

        remove_note(&mut repo, &id)?;
        assert!(remove_note(&mut repo, &id).is_err());

        let mut reloaded = open_repo(&temp)?;
        reloaded.load_all()?;
        assert!(reloaded.is_empty());
        Ok(())
    }

    #[test]
    fn cli_legacy_output_handles_empty_note() {
        assert_eq!(format_legacy(&LegacyNote::default()), "(empty)\n");
        let note = LegacyNote {
            title: "Draft".into(),
            content: "<p>hello</p>".into(),
        };
        assert_eq!(format_legacy(&note), "Draft\n\nhello\n");
    }
}
