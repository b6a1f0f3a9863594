//! Scripted stand-ins for developer tooling. Nothing here runs a real
//! process; long-running commands hand a paced [`Job`] to the session's
//! progress queue.

use crate::defaults;
use crate::output::{Action, LineKind, Output};
use crate::progress::Job;
use crate::shell::{split_flags, Ctx};

/// Pid shown for whatever job the session's queue is running.
const JOB_PID: u32 = 4242;

const STATIC_PROCS: &[(u32, &str)] = &[
    (1, "init"),
    (7, "bash"),
    (42, "code-server --port 8080"),
    (108, "node server.js"),
];

fn start(ctx: &mut Ctx<'_>, mut out: Output, job: Job) -> Output {
    tracing::debug!(job = %job.label, ms = job.total_ms(), "simulated job started");
    out.push(LineKind::Plain, "");
    ctx.session.progress.start(job, ctx.now_ms);
    out
}

pub fn ps(ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    let mut out = Output::line(LineKind::Info, "  PID TTY          TIME CMD");
    for (pid, name) in STATIC_PROCS {
        out.push(LineKind::Plain, format!("{:5} pts/0    00:00:00 {}", pid, name));
    }
    if ctx.session.progress.is_running() {
        out.push(
            LineKind::Plain,
            format!("{:5} pts/0    00:00:01 {}", JOB_PID, ctx.session.progress.label()),
        );
    }
    out.push(LineKind::Plain, format!("{:5} pts/0    00:00:00 ps", JOB_PID + 1));
    out
}

pub fn kill(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let Some(arg) = args.iter().find(|a| !a.starts_with('-')) else {
        return Output::error("kill: usage: kill <pid>");
    };
    let Ok(pid) = arg.parse::<u32>() else {
        return Output::error(format!("kill: {}: arguments must be process or job IDs", arg));
    };
    if pid == JOB_PID && ctx.session.progress.is_running() {
        let label = ctx.session.progress.label().to_string();
        ctx.session.progress.cancel();
        return Output::line(LineKind::Warning, format!("[1]+  Terminated              {}", label));
    }
    if pid == 1 {
        return Output::error("kill: (1) - Operation not permitted");
    }
    if STATIC_PROCS.iter().any(|(p, _)| *p == pid) {
        return Output::error(format!("kill: ({}) - Operation not permitted", pid));
    }
    Output::error(format!("kill: ({}) - No such process", pid))
}

pub fn jobs(ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    if ctx.session.progress.is_running() {
        Output::plain(format!(
            "[1]+  Running                 {} &",
            ctx.session.progress.label()
        ))
    } else {
        Output::new()
    }
}

const PING_MAX_COUNT: u32 = 100;

pub fn ping(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let mut count = 4u32;
    let mut host = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-c" {
            match iter.next().and_then(|v| v.parse().ok()) {
                Some(n) if (1..=PING_MAX_COUNT).contains(&n) => count = n,
                Some(n) if n > PING_MAX_COUNT => {
                    return Output::error(format!(
                        "ping: invalid count: {} (max {})",
                        n, PING_MAX_COUNT
                    ))
                }
                _ => return Output::error("ping: bad number of packets to transmit."),
            }
        } else {
            host = Some(arg.as_str());
        }
    }
    let Some(host) = host else {
        return Output::error("ping: usage error: Destination address required");
    };
    // stable fake address per host
    let seed: u32 = host.bytes().fold(0u32, |acc, b| acc.wrapping_add(u32::from(b)));
    let ip = format!("93.184.{}.{}", seed % 256, (seed / 7) % 256);
    let out = Output::line(
        LineKind::Plain,
        format!("PING {} ({}) 56(84) bytes of data.", host, ip),
    );
    let mut job = Job::new(format!("ping {}", host));
    for seq in 1..=count {
        let ms = 10 + seed.wrapping_add(seq.wrapping_mul(13)) % 30;
        job = job.step(
            1000,
            LineKind::Plain,
            format!("64 bytes from {}: icmp_seq={} ttl=56 time={}.{} ms", ip, seq, ms, seq % 10),
        );
    }
    job = job
        .step(0, LineKind::Plain, "")
        .step(0, LineKind::Plain, format!("--- {} ping statistics ---", host))
        .step(
            0,
            LineKind::Plain,
            format!("{} packets transmitted, {} received, 0% packet loss", count, count),
        );
    start(ctx, out, job)
}

pub fn matrix(_ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    let mut out = Output::line(LineKind::Success, "Wake up, Neo...");
    out.action = Some(Action::Matrix);
    out
}

pub fn git(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let sub = args.first().map(String::as_str).unwrap_or("");
    match sub {
        "status" => git_status(ctx),
        "log" => {
            let mut out = Output::new();
            for (hash, msg, when) in [
                ("a3f9c21", "Add Flutter demo app", "2 days ago"),
                ("7be0d4e", "Kotlin sample with Gradle build", "5 days ago"),
                ("19c2f07", "Portfolio landing page", "2 weeks ago"),
                ("0d41a8b", "Initial commit", "3 weeks ago"),
            ] {
                out.push(LineKind::Warning, format!("commit {}", hash));
                out.push(LineKind::Plain, format!("Author: {} <hello@portfolio.dev>", defaults::OWNER));
                out.push(LineKind::Plain, format!("Date:   {}", when));
                out.push(LineKind::Plain, "");
                out.push(LineKind::Plain, format!("    {}", msg));
                out.push(LineKind::Plain, "");
            }
            out
        }
        "branch" => {
            let mut out = Output::line(LineKind::Success, "* main");
            out.push(LineKind::Plain, "  feature/flutter-demo");
            out
        }
        "diff" => git_diff(ctx),
        "add" => {
            if args.len() < 2 {
                Output::line(LineKind::Warning, "Nothing specified, nothing added.")
            } else {
                Output::new()
            }
        }
        "commit" => {
            let message = args
                .iter()
                .position(|a| a == "-m")
                .and_then(|i| args.get(i + 1))
                .cloned();
            let changed = ctx.workspace.overrides().len();
            match message {
                Some(m) if changed > 0 => {
                    let mut out = Output::plain(format!("[main 5e1f0aa] {}", m));
                    out.push(
                        LineKind::Plain,
                        format!(
                            " {} file{} changed",
                            changed,
                            if changed == 1 { "" } else { "s" }
                        ),
                    );
                    out
                }
                Some(_) => Output::plain("nothing to commit, working tree clean"),
                None => Output::error("error: switch `m' requires a value"),
            }
        }
        "push" => {
            let out = Output::plain("Enumerating objects: 12, done.");
            let job = Job::new("git push")
                .step(300, LineKind::Plain, "Counting objects: 100% (12/12), done.")
                .step(300, LineKind::Plain, "Compressing objects: 100% (7/7), done.")
                .step(500, LineKind::Plain, "Writing objects: 100% (7/7), 1.21 KiB | 1.21 MiB/s, done.")
                .step(400, LineKind::Plain, format!("To {}/portfolio.git", defaults::GITHUB_URL))
                .step(0, LineKind::Success, "   19c2f07..a3f9c21  main -> main");
            start(ctx, out, job)
        }
        "pull" => Output::plain("Already up to date."),
        "remote" => Output::block(&format!(
            "origin\t{0}/portfolio.git (fetch)\norigin\t{0}/portfolio.git (push)",
            defaults::GITHUB_URL
        )),
        "clone" => {
            let Some(url) = args.get(1) else {
                return Output::error("fatal: You must specify a repository to clone.");
            };
            let name = url
                .trim_end_matches('/')
                .trim_end_matches(".git")
                .rsplit('/')
                .next()
                .unwrap_or("repo")
                .to_string();
            let out = Output::plain(format!("Cloning into '{}'...", name));
            let job = Job::new(format!("git clone {}", url))
                .step(400, LineKind::Plain, "remote: Enumerating objects: 248, done.")
                .step(400, LineKind::Plain, "Receiving objects: 100% (248/248), 1.02 MiB | 4.1 MiB/s, done.")
                .step(300, LineKind::Plain, "Resolving deltas: 100% (97/97), done.")
                .step(0, LineKind::Warning, "(simulated: nothing was written to the workspace)");
            start(ctx, out, job)
        }
        "" | "help" | "--help" => {
            let mut out = Output::plain("usage: git <command> [<args>]");
            out.push(
                LineKind::Plain,
                "   status  log  branch  diff  add  commit  push  pull  remote  clone",
            );
            out
        }
        other => Output::error(format!(
            "git: '{}' is not a git command. See 'git --help'.",
            other
        )),
    }
}

fn git_status(ctx: &Ctx<'_>) -> Output {
    let baseline = defaults::default_registry();
    let modified: Vec<&String> = ctx.workspace.overrides().keys().collect();
    let untracked: Vec<&str> = ctx
        .workspace
        .registry()
        .records()
        .iter()
        .filter(|r| !r.is_marker() && !baseline.is_file(&r.path))
        .map(|r| r.path.as_str())
        .collect();
    let deleted: Vec<&str> = baseline
        .records()
        .iter()
        .filter(|r| !r.is_marker() && !ctx.workspace.registry().is_file(&r.path))
        .map(|r| r.path.as_str())
        .collect();

    let mut out = Output::plain("On branch main");
    out.push(LineKind::Plain, "Your branch is up to date with 'origin/main'.");
    if modified.is_empty() && untracked.is_empty() && deleted.is_empty() {
        out.push(LineKind::Plain, "");
        out.push(LineKind::Plain, "nothing to commit, working tree clean");
        return out;
    }
    if !modified.is_empty() || !deleted.is_empty() {
        out.push(LineKind::Plain, "");
        out.push(LineKind::Plain, "Changes not staged for commit:");
        for p in &modified {
            out.push(LineKind::Error, format!("\tmodified:   {}", p.trim_start_matches('/')));
        }
        for p in &deleted {
            out.push(LineKind::Error, format!("\tdeleted:    {}", p.trim_start_matches('/')));
        }
    }
    if !untracked.is_empty() {
        out.push(LineKind::Plain, "");
        out.push(LineKind::Plain, "Untracked files:");
        for p in &untracked {
            out.push(LineKind::Error, format!("\t{}", p.trim_start_matches('/')));
        }
    }
    out
}

fn git_diff(ctx: &Ctx<'_>) -> Output {
    let mut out = Output::new();
    for (path, edited) in ctx.workspace.overrides() {
        let Some(record) = ctx.workspace.registry().get(path) else {
            continue;
        };
        let rel = path.trim_start_matches('/');
        out.push(LineKind::Accent, format!("diff --git a/{} b/{}", rel, rel));
        out.push(LineKind::Plain, format!("--- a/{}", rel));
        out.push(LineKind::Plain, format!("+++ b/{}", rel));
        let old: Vec<&str> = record.content.lines().collect();
        let new: Vec<&str> = edited.lines().collect();
        for i in 0..old.len().max(new.len()) {
            match (old.get(i), new.get(i)) {
                (Some(a), Some(b)) if a == b => {}
                (a, b) => {
                    if let Some(a) = a {
                        out.push(LineKind::Error, format!("-{}", a));
                    }
                    if let Some(b) = b {
                        out.push(LineKind::Success, format!("+{}", b));
                    }
                }
            }
        }
    }
    out
}

pub fn npm(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let (flags, operands) = split_flags(args);
    if flags.contains(&'v') || args.iter().any(|a| a == "--version") {
        return Output::plain("10.2.4");
    }
    match operands.as_slice() {
        ["install" | "i", ..] => {
            let out = Output::plain("npm install");
            let job = Job::new("npm install")
                .step(600, LineKind::Plain, "⠙ idealTree: timing idealTree Completed in 412ms")
                .step(900, LineKind::Plain, "⠹ reify: timing reifyNode:node_modules/vite Completed in 1203ms")
                .step(300, LineKind::Plain, "")
                .step(0, LineKind::Success, "added 87 packages, and audited 88 packages in 2s")
                .step(0, LineKind::Success, "found 0 vulnerabilities");
            start(ctx, out, job)
        }
        ["run", script, ..] => npm_script(ctx, script),
        ["run"] => {
            let mut out = Output::plain("Scripts available in portfolio-web via `npm run-script`:");
            for s in ["start", "build", "test"] {
                out.push(LineKind::Plain, format!("  {}", s));
            }
            out
        }
        ["start", ..] => npm_script(ctx, "start"),
        ["test", ..] => npm_script(ctx, "test"),
        [] => Output::block("Usage: npm <command>\n\nnpm install, npm run <script>, npm start, npm test"),
        [other, ..] => Output::error(format!("Unknown command: \"{}\"", other)),
    }
}

fn npm_script(ctx: &mut Ctx<'_>, script: &str) -> Output {
    let command = match script {
        "start" => "serve web",
        "build" => "vite build",
        "test" => "vitest run",
        other => {
            return Output::error(format!("npm ERR! Missing script: \"{}\"", other));
        }
    };
    let mut out = Output::plain("");
    out.push(LineKind::Plain, format!("> portfolio-web@1.0.0 {}", script));
    out.push(LineKind::Plain, format!("> {}", command));
    let job = match script {
        "start" => Job::new("npm start")
            .step(500, LineKind::Info, "   Serving!")
            .step(0, LineKind::Plain, "   - Local:    http://localhost:3000"),
        "build" => Job::new("npm run build")
            .step(400, LineKind::Plain, "vite v5.0.12 building for production...")
            .step(700, LineKind::Plain, "✓ 14 modules transformed.")
            .step(300, LineKind::Plain, "dist/index.html   0.46 kB │ gzip: 0.30 kB")
            .step(0, LineKind::Success, "✓ built in 1.12s"),
        _ => Job::new("npm test")
            .step(600, LineKind::Success, " ✓ src/app.test.js (3)")
            .step(200, LineKind::Plain, "")
            .step(0, LineKind::Success, " Test Files  1 passed (1)")
            .step(0, LineKind::Success, "      Tests  3 passed (3)"),
    };
    start(ctx, out, job)
}

pub fn flutter(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let sub: Vec<&str> = args.iter().map(String::as_str).collect();
    match sub.as_slice() {
        ["--version" | "-v", ..] => {
            let mut out = Output::plain("Flutter 3.19.0 • channel stable • https://github.com/flutter/flutter.git");
            out.push(LineKind::Plain, "Tools • Dart 3.3.0 • DevTools 2.31.1");
            out
        }
        ["doctor", ..] => {
            let mut out = Output::plain("Doctor summary (to see all details, run flutter doctor -v):");
            out.push(LineKind::Success, "[✓] Flutter (Channel stable, 3.19.0)");
            out.push(LineKind::Success, "[✓] Android toolchain - develop for Android devices (Android SDK version 34.0.0)");
            out.push(LineKind::Success, "[✓] Chrome - develop for the web");
            out.push(LineKind::Warning, "[!] Xcode - develop for iOS and macOS (not installed)");
            out.push(LineKind::Success, "[✓] VS Code (version 1.86.0)");
            out.push(LineKind::Plain, "");
            out.push(LineKind::Warning, "! Doctor found issues in 1 category.");
            out
        }
        ["pub", "get", ..] => {
            let mut out = Output::plain("Resolving dependencies...");
            out.push(LineKind::Success, "Got dependencies!");
            out
        }
        ["run", ..] => {
            if !ctx.workspace.registry().is_file("/flutter/lib/main.dart") {
                return Output::error("Error: No pubspec.yaml file found or lib/main.dart is missing.");
            }
            let out = Output::plain("Launching lib/main.dart on Chrome in debug mode...");
            let job = Job::new("flutter run")
                .step(800, LineKind::Plain, "Waiting for connection from debug service on Chrome...")
                .step(1200, LineKind::Plain, "This app is linked to the debug service: ws://127.0.0.1:53211/ws")
                .step(300, LineKind::Plain, "Debug service listening on ws://127.0.0.1:53211/ws")
                .step(200, LineKind::Success, "🔥  To hot restart changes while running, press \"r\" or \"R\".")
                .step(0, LineKind::Plain, "Application running. Type `kill 4242` to stop it.");
            start(ctx, out, job)
        }
        ["build", target, ..] => {
            let artifact = match *target {
                "apk" => "build/app/outputs/flutter-apk/app-release.apk (18.4MB)",
                "web" => "build/web",
                "appbundle" => "build/app/outputs/bundle/release/app-release.aab (16.9MB)",
                other => return Output::error(format!("Could not find a subcommand named \"{}\" for \"flutter build\".", other)),
            };
            let out = Output::plain(format!("Building {} in release mode...", target));
            let job = Job::new(format!("flutter build {}", target))
                .step(900, LineKind::Plain, "Running Gradle task 'assembleRelease'...")
                .step(1600, LineKind::Plain, "Font asset \"MaterialIcons-Regular.otf\" was tree-shaken, reducing it by 99.6%.")
                .step(0, LineKind::Success, format!("✓ Built {}", artifact));
            start(ctx, out, job)
        }
        _ => {
            let mut out = Output::plain("Manage your Flutter app development.");
            out.push(LineKind::Plain, "Usage: flutter <run|build apk|build web|doctor|pub get|--version>");
            out
        }
    }
}

pub fn gradle(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    match args.first().map(String::as_str).unwrap_or("build") {
        "build" | "assemble" => {
            let out = Output::plain("Starting a Gradle Daemon (subsequent builds will be faster)");
            let job = Job::new("gradle build")
                .step(700, LineKind::Plain, "> Task :compileKotlin")
                .step(400, LineKind::Plain, "> Task :compileJava NO-SOURCE")
                .step(200, LineKind::Plain, "> Task :classes")
                .step(300, LineKind::Plain, "> Task :jar")
                .step(200, LineKind::Plain, "> Task :build")
                .step(0, LineKind::Plain, "")
                .step(0, LineKind::Success, "BUILD SUCCESSFUL in 3s")
                .step(0, LineKind::Plain, "5 actionable tasks: 5 executed");
            start(ctx, out, job)
        }
        "test" => {
            let out = Output::plain("> Task :test");
            let job = Job::new("gradle test")
                .step(900, LineKind::Plain, "MainTest > printsSkills() PASSED")
                .step(0, LineKind::Success, "BUILD SUCCESSFUL in 2s");
            start(ctx, out, job)
        }
        "run" => {
            let mut out = Output::plain("> Task :run");
            out.push(LineKind::Plain, "-> Kotlin");
            out.push(LineKind::Plain, "-> Flutter");
            out.push(LineKind::Plain, "-> Compose");
            out.push(LineKind::Success, "BUILD SUCCESSFUL in 1s");
            out
        }
        "tasks" => {
            let mut out = Output::line(LineKind::Accent, "Build tasks");
            out.push(LineKind::Plain, "-----------");
            for (t, d) in [
                ("assemble", "Assembles the outputs of this project."),
                ("build", "Assembles and tests this project."),
                ("clean", "Deletes the build directory."),
                ("run", "Runs this project as a JVM application."),
                ("test", "Runs the test suite."),
            ] {
                out.push(LineKind::Plain, format!("{} - {}", t, d));
            }
            out
        }
        other => Output::error(format!("Task '{}' not found in root project 'portfolio'.", other)),
    }
}

pub fn adb(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    match args.first().map(String::as_str) {
        Some("devices") => {
            let mut out = Output::plain("List of devices attached");
            out.push(LineKind::Plain, "emulator-5554\tdevice");
            out
        }
        Some("install") => {
            let Some(apk) = args.get(1) else {
                return Output::error("adb: need APK file on command line");
            };
            let out = Output::plain("Performing Streamed Install");
            let job = Job::new(format!("adb install {}", apk))
                .step(1200, LineKind::Success, "Success");
            start(ctx, out, job)
        }
        Some("logcat") => {
            let mut out = Output::new();
            for line in [
                "I/flutter ( 4242): Hello from Flutter",
                "D/PortfolioApp( 4242): onCreate",
                "I/ActivityManager(  512): Displayed dev.portfolio/.MainActivity: +312ms",
            ] {
                out.push(LineKind::Plain, line);
            }
            out
        }
        _ => Output::block("Android Debug Bridge version 1.0.41\nUsage: adb <devices|install|logcat>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::shell::Interpreter;
    use crate::sink::QueuedSink;
    use crate::workspace::{ContentOverrides, Workspace};

    fn run(ws: &mut Workspace, session: &mut Session, line: &str, now_ms: f64) -> Output {
        let mut sink = QueuedSink::new();
        Interpreter::new()
            .execute(line, session, ws, &mut sink, now_ms)
            .unwrap_or_default()
    }

    fn setup() -> (Workspace, Session) {
        (
            Workspace::new(defaults::default_registry(), ContentOverrides::new()),
            Session::new(1, "bash"),
        )
    }

    #[test]
    fn git_status_tracks_workspace_changes() {
        let (mut ws, mut s) = setup();
        assert!(run(&mut ws, &mut s, "git status", 0.0)
            .text()
            .contains("working tree clean"));
        ws.write("/web/style.css", "x").unwrap();
        ws.create_file("/notes/todo.txt", "").unwrap();
        ws.remove_file("/package.json").unwrap();
        let text = run(&mut ws, &mut s, "gs", 0.0).text();
        assert!(text.contains("modified:   web/style.css"));
        assert!(text.contains("deleted:    package.json"));
        assert!(text.contains("\tnotes/todo.txt"));
    }

    #[test]
    fn long_commands_run_as_jobs() {
        let (mut ws, mut s) = setup();
        run(&mut ws, &mut s, "ping -c 2 example.com", 0.0);
        assert!(s.progress.is_running());
        assert!(run(&mut ws, &mut s, "ps", 0.0).text().contains("ping example.com"));
        let out = run(&mut ws, &mut s, "kill 4242", 10.0);
        assert_eq!(out.lines[0].kind, LineKind::Warning);
        assert!(!s.progress.is_running());
    }

    #[test]
    fn ping_count_is_bounded() {
        let (mut ws, mut s) = setup();
        let out = run(&mut ws, &mut s, "ping -c 3000000 example.com", 0.0);
        assert_eq!(out.lines[0].text, "ping: invalid count: 3000000 (max 100)");
        assert!(!s.progress.is_running());
        assert!(run(&mut ws, &mut s, "ping -c 0 example.com", 0.0).has_errors());
        run(&mut ws, &mut s, "ping -c 100 example.com", 0.0);
        assert!(s.progress.is_running());
    }

    #[test]
    fn init_cannot_be_killed() {
        let (mut ws, mut s) = setup();
        assert!(run(&mut ws, &mut s, "kill 1", 0.0).has_errors());
        assert!(run(&mut ws, &mut s, "kill 999", 0.0)
            .text()
            .contains("No such process"));
    }

    #[test]
    fn flutter_run_needs_entry_point() {
        let (mut ws, mut s) = setup();
        assert!(!run(&mut ws, &mut s, "flutter run", 0.0).has_errors());
        ws.remove_file("/flutter/lib/main.dart").unwrap();
        let mut fresh = Session::new(2, "bash");
        assert!(run(&mut ws, &mut fresh, "flutter run", 0.0).has_errors());
        assert!(!fresh.progress.is_running());
    }

    #[test]
    fn matrix_is_an_action() {
        let (mut ws, mut s) = setup();
        assert_eq!(run(&mut ws, &mut s, "matrix", 0.0).action, Some(Action::Matrix));
    }
}
