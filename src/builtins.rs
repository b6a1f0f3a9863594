//! File commands over the virtual workspace.

use crate::error::FsError;
use crate::output::{Action, LineKind, Output};
use crate::path;
use crate::shell::{split_flags, Ctx};
use crate::sink::ToastKind;
use crate::vfs::{ListEntry, MARKER};

const DEFAULT_LINES: usize = 10;

fn fs_error(cmd: &str, err: FsError) -> Output {
    Output::error(format!("{}: {}", cmd, err))
}

fn missing_operand(cmd: &str) -> Output {
    Output::error(format!("{}: missing operand", cmd))
}

/// Parse `-n N` or `-N` style counts, returning the count and operands.
fn line_count(args: &[String]) -> Result<(usize, Vec<&str>), String> {
    let mut count = DEFAULT_LINES;
    let mut operands = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-n" {
            let v = iter.next().ok_or("option requires an argument -- 'n'")?;
            count = v.parse().map_err(|_| format!("invalid number of lines: '{}'", v))?;
        } else if let Some(n) = arg.strip_prefix('-').and_then(|d| d.parse().ok()) {
            count = n;
        } else {
            operands.push(arg.as_str());
        }
    }
    Ok((count, operands))
}

fn size_of(ctx: &Ctx<'_>, file: &str) -> usize {
    ctx.workspace.content(file).map(str::len).unwrap_or(0)
}

fn render_entry(ctx: &Ctx<'_>, entry: &ListEntry, long: bool, out: &mut Output) {
    let name = if entry.is_directory {
        format!("{}/", entry.name)
    } else {
        entry.name.clone()
    };
    let kind = if entry.is_directory {
        LineKind::Accent
    } else {
        LineKind::Plain
    };
    if long {
        let (tag, size) = if entry.is_directory {
            ("d", 0)
        } else {
            let marker = if ctx.workspace.is_modified(&entry.path) { "M" } else { "-" };
            (marker, size_of(ctx, &entry.path))
        };
        out.push(kind, format!("{} {:>7}  {}", tag, size, name));
    } else {
        out.push(kind, name);
    }
}

pub fn ls(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let (flags, operands) = split_flags(args);
    let all = flags.contains(&'a');
    let long = flags.contains(&'l');
    let targets = if operands.is_empty() { vec!["."] } else { operands };
    let multiple = targets.len() > 1;

    let mut out = Output::new();
    for (i, target) in targets.iter().enumerate() {
        let resolved = ctx.resolve(target);
        let registry = ctx.workspace.registry();
        if let Some(record) = registry.get(&resolved) {
            let entry = ListEntry {
                name: record.name.clone(),
                path: record.path.clone(),
                is_directory: false,
            };
            render_entry(ctx, &entry, long, &mut out);
            continue;
        }
        match registry.list_children(&resolved, all) {
            Some(entries) => {
                if multiple {
                    if i > 0 {
                        out.push(LineKind::Plain, "");
                    }
                    out.push(LineKind::Info, format!("{}:", target));
                }
                for entry in &entries {
                    render_entry(ctx, entry, long, &mut out);
                }
            }
            None => out.push(
                LineKind::Error,
                format!("ls: cannot access '{}': No such file or directory", target),
            ),
        }
    }
    out
}

pub fn cd(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let target = match args.first().map(String::as_str) {
        None => path::ROOT.to_string(),
        Some("-") => match ctx.session.previous_cwd.clone() {
            Some(prev) => prev,
            None => return Output::error("cd: OLDPWD not set"),
        },
        Some(arg) => ctx.resolve(arg),
    };
    let registry = ctx.workspace.registry();
    if registry.is_dir(&target) {
        ctx.session.set_cwd(target);
        Output::new()
    } else if registry.is_file(&target) {
        Output::error(format!("cd: {}: Not a directory", args[0]))
    } else {
        Output::error(format!(
            "cd: {}: No such file or directory",
            args.first().map(String::as_str).unwrap_or_default()
        ))
    }
}

pub fn pwd(ctx: &mut Ctx<'_>, _args: &[String]) -> Output {
    Output::plain(path::display(&ctx.session.cwd))
}

pub fn cat(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    if args.is_empty() {
        return missing_operand("cat");
    }
    let mut out = Output::new();
    for arg in args {
        let resolved = ctx.resolve(arg);
        match ctx.workspace.content(&resolved) {
            Some(content) => out.push_text(LineKind::Plain, content),
            None if ctx.workspace.registry().is_dir(&resolved) => {
                out.push(LineKind::Error, format!("cat: {}: Is a directory", arg))
            }
            None => out.push(
                LineKind::Error,
                format!("cat: {}: No such file or directory", arg),
            ),
        }
    }
    out
}

pub fn touch(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    if args.is_empty() {
        return missing_operand("touch");
    }
    let mut out = Output::new();
    let mut created = 0;
    for arg in args {
        let resolved = ctx.resolve(arg);
        if ctx.workspace.registry().exists(&resolved) {
            continue;
        }
        match ctx.workspace.create_file(&resolved, "") {
            Ok(()) => created += 1,
            Err(e) => out.extend(fs_error("touch", e)),
        }
    }
    if created > 0 {
        ctx.sink.files_changed();
    }
    out
}

pub fn mkdir(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let (flags, operands) = split_flags(args);
    if operands.is_empty() {
        return missing_operand("mkdir");
    }
    let parents = flags.contains(&'p');
    let mut out = Output::new();
    let mut created = false;
    for op in operands {
        let resolved = ctx.resolve(op);
        let result = if parents {
            ctx.workspace.ensure_dir(&resolved)
        } else {
            ctx.workspace.create_dir(&resolved)
        };
        match result {
            Ok(()) => created = true,
            Err(FsError::AlreadyExists(_)) => out.push(
                LineKind::Error,
                format!("mkdir: cannot create directory '{}': File exists", op),
            ),
            Err(e) => out.extend(fs_error("mkdir", e)),
        }
    }
    if created {
        ctx.sink.files_changed();
    }
    out
}

pub fn rm(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let (flags, operands) = split_flags(args);
    let recursive = flags.contains(&'r') || flags.contains(&'R');
    let force = flags.contains(&'f');
    if operands.is_empty() {
        return if force { Output::new() } else { missing_operand("rm") };
    }
    let mut out = Output::new();
    let mut removed_any = false;
    for op in operands {
        let resolved = ctx.resolve(op);
        if ctx.workspace.is_protected(&resolved) {
            out.push(
                LineKind::Error,
                format!("rm: cannot remove '{}': protected file", op),
            );
            ctx.sink
                .toast(ToastKind::Error, &format!("{} is protected", path::file_name(&resolved)));
            continue;
        }
        let registry = ctx.workspace.registry();
        if registry.is_file(&resolved) {
            match ctx.workspace.remove_file(&resolved) {
                Ok(()) => {
                    ctx.sink.close_file(&resolved);
                    removed_any = true;
                }
                Err(e) => out.extend(fs_error("rm", e)),
            }
        } else if registry.is_dir(&resolved) {
            if !recursive {
                out.push(
                    LineKind::Error,
                    format!("rm: cannot remove '{}': Is a directory", op),
                );
                continue;
            }
            match ctx.workspace.remove_dir(&resolved) {
                Ok(removed) => {
                    for p in removed {
                        ctx.sink.close_file(&p);
                    }
                    removed_any = true;
                }
                Err(FsError::Protected(anchor)) => out.push(
                    LineKind::Error,
                    format!("rm: cannot remove '{}': contains protected file {}", op, anchor),
                ),
                Err(e) => out.extend(fs_error("rm", e)),
            }
        } else if !force {
            out.push(
                LineKind::Error,
                format!("rm: cannot remove '{}': No such file or directory", op),
            );
        }
    }
    if removed_any {
        ctx.sink.files_changed();
    }
    out
}

pub fn mv(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let (_, operands) = split_flags(args);
    match operands.as_slice() {
        [] => missing_operand("mv"),
        [src] => Output::error(format!("mv: missing destination file operand after '{}'", src)),
        [src, dst] => {
            let from = ctx.resolve(src);
            let to = ctx.resolve(dst);
            match ctx.workspace.move_path(&from, &to) {
                Ok(dest) => {
                    if dest != from {
                        ctx.sink.close_file(&from);
                        ctx.sink.files_changed();
                    }
                    Output::new()
                }
                Err(FsError::Protected(p)) => {
                    ctx.sink.toast(ToastKind::Error, &format!("{} is protected", p));
                    Output::error(format!("mv: cannot move '{}': protected file", src))
                }
                Err(e) => fs_error("mv", e),
            }
        }
        _ => Output::error("mv: too many operands"),
    }
}

pub fn cp(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let (flags, operands) = split_flags(args);
    let recursive = flags.contains(&'r') || flags.contains(&'R');
    match operands.as_slice() {
        [] => missing_operand("cp"),
        [src] => Output::error(format!("cp: missing destination file operand after '{}'", src)),
        [src, dst] => {
            let from = ctx.resolve(src);
            let to = ctx.resolve(dst);
            match ctx.workspace.copy_path(&from, &to, recursive) {
                Ok(_) => {
                    ctx.sink.files_changed();
                    Output::new()
                }
                Err(FsError::IsADirectory(_)) if !recursive => {
                    Output::error(format!("cp: -r not specified; omitting directory '{}'", src))
                }
                Err(e) => fs_error("cp", e),
            }
        }
        _ => Output::error("cp: too many operands"),
    }
}

pub fn grep(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let (flags, operands) = split_flags(args);
    let ignore_case = flags.contains(&'i');
    let numbers = flags.contains(&'n');
    let recursive = flags.contains(&'r') || flags.contains(&'R');
    let Some((pattern, paths)) = operands.split_first() else {
        return Output::error("usage: grep [-i] [-n] [-r] <pattern> [path...]");
    };
    let needle = if ignore_case {
        pattern.to_lowercase()
    } else {
        pattern.to_string()
    };
    // no path means the working directory, searched recursively
    let (targets, recursive) = if paths.is_empty() {
        (vec![ctx.session.cwd.clone()], true)
    } else {
        (paths.iter().map(|p| ctx.resolve(p)).collect(), recursive)
    };

    let mut files: Vec<String> = Vec::new();
    let mut out = Output::new();
    for (target, arg) in targets.iter().zip(paths.iter().chain(std::iter::repeat(&"."))) {
        let registry = ctx.workspace.registry();
        if registry.is_file(target) {
            files.push(target.clone());
        } else if registry.is_dir(target) {
            if recursive {
                files.extend(
                    registry
                        .walk(target)
                        .into_iter()
                        .filter(|r| !r.is_marker())
                        .map(|r| r.path.clone()),
                );
            } else {
                out.push(LineKind::Error, format!("grep: {}: Is a directory", arg));
            }
        } else {
            out.push(
                LineKind::Error,
                format!("grep: {}: No such file or directory", arg),
            );
        }
    }

    let show_path = files.len() > 1 || recursive;
    for file in &files {
        let content = ctx.workspace.content(file).unwrap_or_default();
        for (n, line) in content.lines().enumerate() {
            let hay = if ignore_case {
                line.to_lowercase()
            } else {
                line.to_string()
            };
            if !hay.contains(&needle) {
                continue;
            }
            let mut text = String::new();
            if show_path {
                text.push_str(file);
                text.push(':');
            }
            if numbers {
                text.push_str(&format!("{}:", n + 1));
            }
            text.push_str(line);
            out.push(LineKind::Plain, text);
        }
    }
    out
}

pub fn find(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let mut start = None;
    let mut name_glob = None;
    let mut kind = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-name" | "-iname" => match iter.next() {
                Some(p) => name_glob = Some((p.clone(), arg == "-iname")),
                None => return Output::error(format!("find: missing argument to `{}'", arg)),
            },
            "-type" => match iter.next().map(String::as_str) {
                Some("f") => kind = Some(false),
                Some("d") => kind = Some(true),
                other => {
                    return Output::error(format!(
                        "find: Unknown argument to -type: {}",
                        other.unwrap_or_default()
                    ))
                }
            },
            _ if start.is_none() => start = Some(arg.clone()),
            _ => return Output::error(format!("find: unknown predicate `{}'", arg)),
        }
    }
    let root = ctx.resolve(start.as_deref().unwrap_or("."));
    let registry = ctx.workspace.registry();
    if !registry.exists(&root) {
        return Output::error(format!(
            "find: '{}': No such file or directory",
            start.unwrap_or_default()
        ));
    }

    let matcher = match name_glob {
        Some((pattern, insensitive)) => {
            match globset::GlobBuilder::new(&pattern)
                .case_insensitive(insensitive)
                .build()
            {
                Ok(glob) => Some(glob.compile_matcher()),
                Err(e) => return Output::error(format!("find: bad pattern: {}", e)),
            }
        }
        None => None,
    };

    // directories are implied by file paths, so collect them alongside
    let mut hits: Vec<(String, bool)> = Vec::new();
    if registry.is_dir(&root) {
        hits.push((root.clone(), true));
        for record in registry.walk(&root) {
            let mut dir = path::parent(&record.path);
            while dir != root && path::is_within(&dir, &root) {
                hits.push((dir.clone(), true));
                dir = path::parent(&dir);
            }
            if !record.is_marker() {
                hits.push((record.path.clone(), false));
            }
        }
    } else {
        hits.push((root.clone(), false));
    }
    hits.sort();
    hits.dedup();

    let mut out = Output::new();
    for (p, is_dir) in hits {
        if kind.is_some_and(|want| want != is_dir) {
            continue;
        }
        if let Some(m) = &matcher {
            if !m.is_match(path::file_name(&p)) {
                continue;
            }
        }
        let line_kind = if is_dir { LineKind::Accent } else { LineKind::Plain };
        out.push(line_kind, p);
    }
    out
}

fn read_lines(ctx: &Ctx<'_>, cmd: &str, args: &[String]) -> Result<(usize, Vec<String>), Output> {
    let (count, operands) = line_count(args).map_err(|e| Output::error(format!("{}: {}", cmd, e)))?;
    let Some(arg) = operands.first() else {
        return Err(missing_operand(cmd));
    };
    let resolved = ctx.resolve(arg);
    match ctx.workspace.content(&resolved) {
        Some(content) => Ok((count, content.lines().map(String::from).collect())),
        None if ctx.workspace.registry().is_dir(&resolved) => Err(Output::error(format!(
            "{}: error reading '{}': Is a directory",
            cmd, arg
        ))),
        None => Err(Output::error(format!(
            "{}: cannot open '{}' for reading: No such file or directory",
            cmd, arg
        ))),
    }
}

pub fn head(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    match read_lines(ctx, "head", args) {
        Ok((count, lines)) => {
            let mut out = Output::new();
            for l in lines.into_iter().take(count) {
                out.push(LineKind::Plain, l);
            }
            out
        }
        Err(e) => e,
    }
}

pub fn tail(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    match read_lines(ctx, "tail", args) {
        Ok((count, lines)) => {
            let mut out = Output::new();
            let skip = lines.len().saturating_sub(count);
            for l in lines.into_iter().skip(skip) {
                out.push(LineKind::Plain, l);
            }
            out
        }
        Err(e) => e,
    }
}

pub fn wc(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    if args.is_empty() {
        return missing_operand("wc");
    }
    let mut out = Output::new();
    let mut totals = (0, 0, 0);
    let mut counted = 0;
    for arg in args {
        let resolved = ctx.resolve(arg);
        match ctx.workspace.content(&resolved) {
            Some(content) => {
                let lines = content.lines().count();
                let words = content.split_whitespace().count();
                let bytes = content.len();
                totals = (totals.0 + lines, totals.1 + words, totals.2 + bytes);
                counted += 1;
                out.push(
                    LineKind::Plain,
                    format!("{:>7} {:>7} {:>7} {}", lines, words, bytes, arg),
                );
            }
            None if ctx.workspace.registry().is_dir(&resolved) => {
                out.push(LineKind::Error, format!("wc: {}: Is a directory", arg))
            }
            None => out.push(
                LineKind::Error,
                format!("wc: {}: No such file or directory", arg),
            ),
        }
    }
    if counted > 1 {
        out.push(
            LineKind::Plain,
            format!("{:>7} {:>7} {:>7} total", totals.0, totals.1, totals.2),
        );
    }
    out
}

fn tree_walk(
    ctx: &Ctx<'_>,
    dir: &str,
    prefix: &str,
    depth: usize,
    max_depth: Option<usize>,
    counts: &mut (usize, usize),
    out: &mut Output,
) {
    if max_depth.is_some_and(|m| depth > m) {
        return;
    }
    let Some(entries) = ctx.workspace.registry().list_children(dir, false) else {
        return;
    };
    let last = entries.len().saturating_sub(1);
    for (i, entry) in entries.iter().enumerate() {
        let (branch, indent) = if i == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        if entry.is_directory {
            counts.0 += 1;
            out.push(LineKind::Accent, format!("{}{}{}/", prefix, branch, entry.name));
            let child_prefix = format!("{}{}", prefix, indent);
            tree_walk(ctx, &entry.path, &child_prefix, depth + 1, max_depth, counts, out);
        } else {
            counts.1 += 1;
            out.push(LineKind::Plain, format!("{}{}{}", prefix, branch, entry.name));
        }
    }
}

pub fn tree(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let mut max_depth = None;
    let mut start = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-L" {
            match iter.next().and_then(|v| v.parse::<usize>().ok()) {
                Some(n) if n > 0 => max_depth = Some(n),
                _ => return Output::error("tree: Invalid level, must be greater than 0."),
            }
        } else {
            start = Some(arg.as_str());
        }
    }
    let root = ctx.resolve(start.unwrap_or("."));
    if !ctx.workspace.registry().is_dir(&root) {
        return Output::error(format!(
            "{} [error opening dir]",
            start.unwrap_or(".")
        ));
    }
    let mut out = Output::line(LineKind::Accent, path::display(&root));
    let mut counts = (0, 0);
    tree_walk(ctx, &root, "", 1, max_depth, &mut counts, &mut out);
    out.push(LineKind::Plain, "");
    out.push(
        LineKind::Info,
        format!(
            "{} director{}, {} file{}",
            counts.0,
            if counts.0 == 1 { "y" } else { "ies" },
            counts.1,
            if counts.1 == 1 { "" } else { "s" }
        ),
    );
    out
}

/// `nano` and `code`: open in the editor, creating the file if needed.
pub fn edit(ctx: &mut Ctx<'_>, args: &[String]) -> Output {
    let Some(arg) = args.first() else {
        return Output::error("usage: nano <file>");
    };
    let resolved = ctx.resolve(arg);
    let registry = ctx.workspace.registry();
    if registry.is_dir(&resolved) && !registry.is_file(&resolved) {
        return Output::error(format!("{}: Is a directory", arg));
    }
    if path::file_name(&resolved) == MARKER {
        return Output::error(format!("{}: reserved file name", arg));
    }
    if !registry.is_file(&resolved) {
        if let Err(e) = ctx.workspace.create_file(&resolved, "") {
            return fs_error("nano", e);
        }
        ctx.sink.files_changed();
    }
    ctx.sink.open_file(&resolved);
    let mut out = Output::line(LineKind::Info, format!("Opening {} in editor...", path::display(&resolved)));
    out.action = Some(Action::OpenFile(resolved));
    out
}
