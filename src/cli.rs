// ============================================================================
// MiniPaint CLI: headless replay of gesture scripts via command-line arguments
// ============================================================================
//
// Usage examples:
//   MiniPaint --script smiley.paint --output smiley.png
//   MiniPaint -s scenes/*.paint --output-dir renders/
//   MiniPaint -s fill.paint --width 10 --height 10 -o fill.png --verbose
//
// Each script is replayed against a fresh session, exactly as if its pointer
// events and commands had come from the interactive shell.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use egui::{PointerButton, Pos2, Vec2};
use image::Rgba;

use crate::components::tools::Tool;
use crate::project::Project;
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// MiniPaint headless gesture-script runner.
#[derive(Parser, Debug)]
#[command(
    name = "MiniPaint",
    about = "MiniPaint headless gesture-script runner",
    long_about = "Replay scripted pointer gestures and editor commands against a\n\
                  fresh canvas and write the result as PNG.\n\n\
                  Example:\n  \
                  MiniPaint --script smiley.paint --output smiley.png\n  \
                  MiniPaint -s 'scenes/*.paint' --output-dir renders/"
)]
pub struct CliArgs {
    /// Script file(s). Glob patterns accepted (e.g. "*.paint").
    #[arg(short, long, required = true, num_args = 1..)]
    pub script: Vec<String>,

    /// Output PNG path. Only valid for a single script.
    /// For several scripts use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory; files are named after each script's stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Canvas width in pixels (overrides the settings file).
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height in pixels (overrides the settings file).
    #[arg(long)]
    pub height: Option<u32>,

    /// Settings file to use instead of the platform default.
    #[arg(long, value_name = "CFG")]
    pub settings: Option<PathBuf>,

    /// Echo the session log to stderr and print per-script timing.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run every script and return an OS exit code.
/// `0` = all scripts succeeded, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    if args.verbose {
        crate::logger::set_echo_stderr(true);
    }

    let scripts = collect_scripts(&args.script);
    if scripts.is_empty() {
        eprintln!("error: no script files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if scripts.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} scripts given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory.",
            scripts.len()
        );
        return ExitCode::FAILURE;
    }

    let mut settings = match &args.settings {
        Some(path) => match EditorSettings::load_from(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: could not load settings '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => EditorSettings::load(),
    };
    if let Some(w) = args.width {
        settings.canvas_width = w.max(1);
    }
    if let Some(h) = args.height {
        settings.canvas_height = h.max(1);
    }

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = scripts.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, script_path) in scripts.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, script_path.display());
        }
        let start = Instant::now();

        let Some(output_path) =
            build_output_path(script_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!("  error: cannot determine output path for '{}'.", script_path.display());
            any_failure = true;
            continue;
        };

        match run_one(script_path, &output_path, &settings) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  -> {} ({:.0}ms)",
                        output_path.display(),
                        start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", script_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-script pipeline
// ============================================================================

fn run_one(script: &Path, output: &Path, settings: &EditorSettings) -> Result<(), String> {
    let source = std::fs::read_to_string(script)
        .map_err(|e| format!("could not read script: {}", e))?;

    let mut project = Project::new(settings.clone());
    run_script(&mut project, &source)?;

    project
        .save(output)
        .map_err(|e| format!("save failed: {}", e))
}

/// Replay `source` against `project`, stopping at the first bad line.
pub fn run_script(project: &mut Project, source: &str) -> Result<(), String> {
    for (idx, line) in source.lines().enumerate() {
        let command = parse_command(line).map_err(|e| format!("line {}: {}", idx + 1, e))?;
        if let Some(command) = command {
            execute(project, command).map_err(|e| format!("line {}: {}", idx + 1, e))?;
        }
    }
    Ok(())
}

// ============================================================================
// Script language
// ============================================================================

/// One line of a gesture script.  Coordinates are view-space.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptCommand {
    Tool(Tool),
    Color(Rgba<u8>),
    Brush(u32),
    Stroke(u32),
    Connectivity(u8),
    Zoom(f32),
    View(f32, f32),
    Press(Pos2, PointerButton),
    Move(Pos2),
    Release(Pos2, PointerButton),
    Wheel(Pos2, f32),
    Undo,
    Redo,
    Clear,
    Commit,
    Save(PathBuf),
}

/// Parse one script line.  Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ScriptCommand>, String> {
    let line = match line.split_once('#') {
        Some((code, _)) => code,
        None => line,
    }
    .trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "tool" => {
            let name = args.first().ok_or("tool needs a name")?;
            ScriptCommand::Tool(Tool::from_name(name).ok_or_else(|| format!("unknown tool '{}'", name))?)
        }
        "color" | "colour" => {
            if args.len() != 3 && args.len() != 4 {
                return Err("color needs r g b [a]".to_string());
            }
            let mut c = [0u8, 0, 0, 255];
            for (slot, raw) in c.iter_mut().zip(&args) {
                *slot = parse_num(raw)?;
            }
            ScriptCommand::Color(Rgba(c))
        }
        "brush" => ScriptCommand::Brush(parse_num(arg(&args, 0)?)?),
        "stroke" => ScriptCommand::Stroke(parse_num(arg(&args, 0)?)?),
        "connectivity" => ScriptCommand::Connectivity(parse_num(arg(&args, 0)?)?),
        "zoom" => ScriptCommand::Zoom(parse_num(arg(&args, 0)?)?),
        "view" => ScriptCommand::View(parse_num(arg(&args, 0)?)?, parse_num(arg(&args, 1)?)?),
        "press" => ScriptCommand::Press(parse_pos(&args)?, parse_button(args.get(2))?),
        "move" => ScriptCommand::Move(parse_pos(&args)?),
        "release" => ScriptCommand::Release(parse_pos(&args)?, parse_button(args.get(2))?),
        "wheel" => ScriptCommand::Wheel(parse_pos(&args)?, parse_num(arg(&args, 2)?)?),
        "undo" => ScriptCommand::Undo,
        "redo" => ScriptCommand::Redo,
        "clear" => ScriptCommand::Clear,
        "commit" => ScriptCommand::Commit,
        "save" => ScriptCommand::Save(PathBuf::from(arg(&args, 0)?)),
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(Some(command))
}

fn execute(project: &mut Project, command: ScriptCommand) -> Result<(), String> {
    match command {
        ScriptCommand::Tool(tool) => project.set_tool(tool),
        ScriptCommand::Color(c) => project.set_brush_color(c),
        ScriptCommand::Brush(n) => project.set_brush_size(n),
        ScriptCommand::Stroke(n) => project.set_stroke_size(n),
        ScriptCommand::Connectivity(n) => {
            if !project.set_fill_connectivity(n) {
                return Err(format!("connectivity must be 4 or 8, got {}", n));
            }
        }
        ScriptCommand::Zoom(z) => project.set_zoom(z),
        ScriptCommand::View(w, h) => project.set_view_size(Vec2::new(w, h)),
        ScriptCommand::Press(pos, button) => project.press(pos, button),
        ScriptCommand::Move(pos) => project.pointer_move(pos),
        ScriptCommand::Release(pos, button) => project.release(pos, button),
        ScriptCommand::Wheel(pos, delta) => project.wheel(pos, delta),
        ScriptCommand::Undo => {
            project.undo();
        }
        ScriptCommand::Redo => {
            project.redo();
        }
        ScriptCommand::Clear => project.clear(),
        ScriptCommand::Commit => {
            project.commit_floating_selection();
        }
        ScriptCommand::Save(path) => {
            project.save(&path).map_err(|e| format!("save failed: {}", e))?;
        }
    }
    Ok(())
}

fn arg<'a>(args: &[&'a str], idx: usize) -> Result<&'a str, String> {
    args.get(idx)
        .copied()
        .ok_or_else(|| format!("missing argument {}", idx + 1))
}

fn parse_num<T: std::str::FromStr>(raw: &str) -> Result<T, String> {
    raw.parse().map_err(|_| format!("invalid number '{}'", raw))
}

fn parse_pos(args: &[&str]) -> Result<Pos2, String> {
    Ok(Pos2::new(parse_num(arg(args, 0)?)?, parse_num(arg(args, 1)?)?))
}

fn parse_button(raw: Option<&&str>) -> Result<PointerButton, String> {
    match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
        None | Some("left") => Ok(PointerButton::Primary),
        Some("middle") => Ok(PointerButton::Middle),
        Some("right") => Ok(PointerButton::Secondary),
        Some(other) => Err(format!("unknown button '{}'", other)),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Script files named by `patterns`, in command-line order and each listed
/// once.  A pattern naming an existing file is taken literally; anything
/// else is expanded as a glob and only regular files are kept.
fn collect_scripts(patterns: &[String]) -> Vec<PathBuf> {
    let mut scripts: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let found: Vec<PathBuf> = if Path::new(pattern).is_file() {
            vec![PathBuf::from(pattern)]
        } else {
            match glob::glob(pattern) {
                Ok(paths) => paths.filter_map(Result::ok).filter(|p| p.is_file()).collect(),
                Err(e) => {
                    eprintln!("warning: bad script pattern '{}': {}", pattern, e);
                    continue;
                }
            }
        };
        if found.is_empty() {
            eprintln!("warning: no script matches '{}'", pattern);
        }
        for path in found {
            if !scripts.contains(&path) {
                scripts.push(path);
            }
        }
    }
    scripts
}

/// Compute the output path for a single script.
///
/// Priority:
/// 1. `--output` (explicit path, single script)
/// 2. `--output-dir` (batch directory, filename from the script stem)
/// 3. Fallback: next to the script, same stem, `.png`
fn build_output_path(script: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = script.file_stem()?.to_string_lossy().into_owned();
    let file_name = format!("{}.png", stem);

    if let Some(dir) = output_dir {
        return Some(dir.join(file_name));
    }

    let parent = script.parent().unwrap_or(Path::new("."));
    Some(parent.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_skips_comments() {
        assert_eq!(parse_command("  # just a comment").unwrap(), None);
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(
            parse_command("tool rectangle  # outline").unwrap(),
            Some(ScriptCommand::Tool(Tool::Rectangle))
        );
        assert_eq!(
            parse_command("color 255 0 0").unwrap(),
            Some(ScriptCommand::Color(Rgba([255, 0, 0, 255])))
        );
        assert_eq!(
            parse_command("press 3.5 4 middle").unwrap(),
            Some(ScriptCommand::Press(Pos2::new(3.5, 4.0), PointerButton::Middle))
        );
        assert_eq!(
            parse_command("release 1 2").unwrap(),
            Some(ScriptCommand::Release(Pos2::new(1.0, 2.0), PointerButton::Primary))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_command("tool lasso").is_err());
        assert!(parse_command("color 1 2").is_err());
        assert!(parse_command("color 300 0 0").is_err());
        assert!(parse_command("press 1").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn script_errors_carry_line_numbers() {
        let mut project = Project::with_size(4, 4);
        let err = run_script(&mut project, "tool fill\n\nconnectivity 6\n").unwrap_err();
        assert!(err.starts_with("line 3:"), "{err}");
    }

    #[test]
    fn output_path_priority() {
        let script = Path::new("scenes/smile.paint");
        assert_eq!(
            build_output_path(script, Some(Path::new("x.png")), Some(Path::new("out"))),
            Some(PathBuf::from("x.png"))
        );
        assert_eq!(
            build_output_path(script, None, Some(Path::new("out"))),
            Some(PathBuf::from("out/smile.png"))
        );
        assert_eq!(
            build_output_path(script, None, None),
            Some(PathBuf::from("scenes/smile.png"))
        );
    }

    #[test]
    fn scripts_are_collected_once_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.paint", "a.paint", "notes.txt"] {
            std::fs::write(dir.path().join(name), "clear\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("c.paint")).unwrap();
        let literal = dir.path().join("b.paint");
        let pattern = dir.path().join("*.paint");

        let scripts = collect_scripts(&[
            literal.to_string_lossy().into_owned(),
            pattern.to_string_lossy().into_owned(),
            dir.path().join("missing-*.paint").to_string_lossy().into_owned(),
        ]);
        assert_eq!(scripts, vec![literal, dir.path().join("a.paint")]);
    }
}

