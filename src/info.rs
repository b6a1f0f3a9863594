use crate::defaults::{GITHUB_URL, HOSTNAME, OWNER};
use crate::output::{Action, LineKind, Output};
use crate::path;
use crate::shell::{find_command, Ctx, Group, COMMANDS};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn help(_ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    let mut out = Output::line(LineKind::Accent, "Available commands:");
    for group in [Group::Files, Group::Shell, Group::System, Group::Dev] {
        out.push(LineKind::Plain, "");
        out.push(LineKind::Info, format!("{}:", group.title()));
        for cmd in COMMANDS.iter().filter(|c| c.group == group) {
            out.push(LineKind::Plain, format!("  {:<10} {}", cmd.name, cmd.summary));
        }
    }
    out.push(LineKind::Plain, "");
    out.push(
        LineKind::Plain,
        "Tab completes commands and paths. Up/Down walk the history. `man <cmd>` for details.",
    );
    out
}

pub fn man(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let Some(name) = args.first() else {
        return Output::error("What manual page do you want?");
    };
    match find_command(&name.to_lowercase()) {
        Some(cmd) => {
            let mut out = Output::line(LineKind::Accent, format!("{}(1)", cmd.name.to_uppercase()));
            out.push(LineKind::Info, "NAME");
            out.push(LineKind::Plain, format!("    {} - {}", cmd.name, cmd.summary));
            out.push(LineKind::Info, "SYNOPSIS");
            out.push(LineKind::Plain, format!("    {}", cmd.usage));
            let aliases: Vec<&str> = ctx
                .aliases
                .iter()
                .filter(|(_, v)| v.split_whitespace().next() == Some(cmd.name))
                .map(|(k, _)| k.as_str())
                .collect();
            if !aliases.is_empty() {
                out.push(LineKind::Info, "ALIASES");
                out.push(LineKind::Plain, format!("    {}", aliases.join(", ")));
            }
            out
        }
        None => Output::error(format!("No manual entry for {}", name)),
    }
}

pub fn history(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    if args.first().map(String::as_str) == Some("-c") {
        ctx.session.history.clear();
        return Output::new();
    }
    let mut out = Output::new();
    for (i, entry) in ctx.session.history.entries().iter().enumerate() {
        out.push(LineKind::Plain, format!("{:4}  {}", i + 1, entry));
    }
    out
}

pub fn clear(ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    ctx.session.scrollback.clear();
    Output::action(Action::Clear)
}

pub fn echo(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let ctx: &Ctx<'_> = ctx;
    let text = args
        .iter()
        .map(|a| expand_vars(ctx, a))
        .collect::<Vec<_>>()
        .join(" ");
    if text == "github" {
        let mut out = Output::plain(GITHUB_URL);
        out.action = Some(Action::OpenUrl(GITHUB_URL.into()));
        return out;
    }
    Output::plain(text)
}

fn env_vars(ctx: &Ctx<'_>) -> Vec<(&'static str, String)> {
    vec![
        ("EDITOR", "nano".into()),
        ("HOME", path::display(path::ROOT)),
        ("HOSTNAME", HOSTNAME.into()),
        ("LANG", "en_US.UTF-8".into()),
        ("PWD", path::display(&ctx.session.cwd)),
        ("SHELL", "/bin/bash".into()),
        ("TERM", "xterm-256color".into()),
        ("USER", OWNER.into()),
    ]
}

fn expand_vars(ctx: &Ctx<'_>, arg: &str) -> String {
    match arg.strip_prefix('$') {
        Some(name) => env_vars(ctx)
            .into_iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
            .unwrap_or_default(),
        None => arg.to_string(),
    }
}

pub fn env(ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    let mut out = Output::new();
    for (k, v) in env_vars(ctx) {
        out.push(LineKind::Plain, format!("{}={}", k, v));
    }
    out
}

pub fn alias(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let mut out = Output::new();
    if args.is_empty() {
        for (k, v) in ctx.aliases.iter() {
            out.push(LineKind::Plain, format!("alias {}='{}'", k, v));
        }
        return out;
    }
    // `alias ll='ls -l'` arrives tokenized as `ll=ls -l`
    let joined = args.join(" ");
    match joined.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() && !value.trim().is_empty() => {
            let name = name.trim();
            if name.contains(char::is_whitespace) {
                return Output::error(format!("alias: `{}': invalid alias name", name));
            }
            ctx.aliases.insert(name.into(), value.trim().into());
            tracing::debug!(alias = name, "alias defined");
        }
        Some(_) => out.push(LineKind::Error, "usage: alias name=value"),
        None => {
            for name in args {
                match ctx.aliases.get(name) {
                    Some(v) => out.push(LineKind::Plain, format!("alias {}='{}'", name, v)),
                    None => out.push(LineKind::Error, format!("alias: {}: not found", name)),
                }
            }
        }
    }
    out
}

pub fn unalias(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    if args.is_empty() {
        return Output::error("unalias: usage: unalias name [name ...]");
    }
    let mut out = Output::new();
    for name in args {
        if ctx.aliases.remove(name).is_none() {
            out.push(LineKind::Error, format!("unalias: {}: not found", name));
        }
    }
    out
}

pub fn which(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let mut out = Output::new();
    for name in args {
        if let Some(v) = ctx.aliases.get(name) {
            out.push(LineKind::Plain, format!("{}: aliased to {}", name, v));
        } else if find_command(name).is_some() {
            out.push(LineKind::Plain, format!("/usr/bin/{}", name));
        } else {
            out.push(LineKind::Error, format!("{} not found", name));
        }
    }
    out
}

pub fn exit(_ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    let mut out = Output::line(LineKind::Info, "logout");
    out.action = Some(Action::CloseTerminal);
    out
}

pub fn whoami(_ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    let mut out = Output::line(LineKind::Accent, OWNER);
    out.push(LineKind::Plain, "Mobile & web developer: Kotlin, Flutter, JavaScript.");
    out.push(LineKind::Plain, "Builds Android apps, cross-platform UIs, and fast websites.");
    out.push(LineKind::Info, format!("GitHub: {}", GITHUB_URL));
    out.push(LineKind::Plain, "Run `cat about.md` for the long version.");
    out
}

pub fn date(_ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    let now = chrono::Local::now();
    Output::plain(now.format("%a %b %e %H:%M:%S %Z %Y").to_string())
}

pub fn hostname(_ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    Output::plain(HOSTNAME)
}

pub fn uname(_ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    if args.iter().any(|a| a == "-a") {
        Output::plain(format!(
            "PortfolioOS {} {} #1 SMP wasm32 GNU/Linux",
            HOSTNAME, VERSION
        ))
    } else {
        Output::plain("PortfolioOS")
    }
}
