use crate::vfs::{FileRecord, Registry};

pub const OWNER: &str = "dev";
pub const HOSTNAME: &str = "portfolio";
pub const GITHUB_URL: &str = "https://github.com/portfolio-dev";

/// Files the UI always needs; they can be edited but never deleted or moved.
pub const ANCHORS: &[&str] = &["/about.md", "/README.md"];

pub fn is_anchor(path: &str) -> bool {
    ANCHORS.contains(&path)
}

const ABOUT_MD: &str = "# About me\n\n\
Mobile and web developer. Kotlin on Android, Flutter across platforms,\n\
and plain HTML/CSS/JS when a page should just load fast.\n\n\
## Skills\n\n\
- Kotlin, Jetpack Compose, Coroutines\n\
- Dart, Flutter, Riverpod\n\
- JavaScript, TypeScript, React\n\
- Gradle, CI pipelines, Play Store releases\n\n\
## Contact\n\n\
Type `whoami` in the terminal, or open `/contact.json`.\n";

const README_MD: &str = "# portfolio\n\n\
This editor is the portfolio. Browse the explorer, open files in tabs,\n\
and use the terminal below (`help` lists every command).\n\n\
```\n\
ls            list files\n\
tree          show the whole project\n\
cat about.md  read about me\n\
flutter run   start the demo app\n\
```\n";

const INDEX_HTML: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"utf-8\">\n  <title>Portfolio</title>\n  <link rel=\"stylesheet\" href=\"style.css\">\n</head>\n<body>\n  <h1>Hello, I'm dev.</h1>\n  <p id=\"tagline\">I build apps.</p>\n  <button id=\"cta\">Say hi</button>\n  <script src=\"script.js\"></script>\n</body>\n</html>\n";

const STYLE_CSS: &str = "body {\n  font-family: system-ui, sans-serif;\n  background: #1e1e1e;\n  color: #d4d4d4;\n  margin: 3rem;\n}\n\nh1 {\n  color: #569cd6;\n}\n\nbutton {\n  padding: 0.5rem 1rem;\n  border-radius: 4px;\n}\n";

const SCRIPT_JS: &str = "document.getElementById('cta').addEventListener('click', () => {\n  document.getElementById('tagline').textContent = 'Thanks for stopping by!';\n});\n";

const MAIN_KT: &str = "package dev.portfolio\n\nfun main() {\n    val skills = listOf(\"Kotlin\", \"Flutter\", \"Compose\")\n    skills.forEach { println(\"-> $it\") }\n}\n";

const BUILD_GRADLE: &str = "plugins {\n    kotlin(\"jvm\") version \"1.9.22\"\n    application\n}\n\napplication {\n    mainClass.set(\"dev.portfolio.MainKt\")\n}\n";

const MAIN_DART: &str = "import 'package:flutter/material.dart';\n\nvoid main() => runApp(const PortfolioApp());\n\nclass PortfolioApp extends StatelessWidget {\n  const PortfolioApp({super.key});\n\n  @override\n  Widget build(BuildContext context) {\n    return const MaterialApp(\n      home: Scaffold(body: Center(child: Text('Hello from Flutter'))),\n    );\n  }\n}\n";

const PUBSPEC_YAML: &str = "name: portfolio_app\ndescription: Demo app\nversion: 1.0.0+1\n\nenvironment:\n  sdk: '>=3.0.0 <4.0.0'\n\ndependencies:\n  flutter:\n    sdk: flutter\n";

const PACKAGE_JSON: &str = "{\n  \"name\": \"portfolio-web\",\n  \"version\": \"1.0.0\",\n  \"scripts\": {\n    \"start\": \"serve web\",\n    \"build\": \"vite build\",\n    \"test\": \"vitest run\"\n  }\n}\n";

const CONTACT_JSON: &str = "{\n  \"email\": \"hello@portfolio.dev\",\n  \"github\": \"https://github.com/portfolio-dev\"\n}\n";

pub fn anchor_records() -> Vec<FileRecord> {
    vec![
        FileRecord::new("/about.md", ABOUT_MD),
        FileRecord::new("/README.md", README_MD),
    ]
}

/// The registry a first visit (or a corrupt store) starts from.
pub fn default_registry() -> Registry {
    let mut records = anchor_records();
    records.extend([
        FileRecord::new("/contact.json", CONTACT_JSON),
        FileRecord::new("/package.json", PACKAGE_JSON),
        FileRecord::new("/web/index.html", INDEX_HTML),
        FileRecord::new("/web/style.css", STYLE_CSS),
        FileRecord::new("/web/script.js", SCRIPT_JS),
        FileRecord::new("/kotlin/src/Main.kt", MAIN_KT),
        FileRecord::new("/kotlin/build.gradle.kts", BUILD_GRADLE),
        FileRecord::new("/flutter/lib/main.dart", MAIN_DART),
        FileRecord::new("/flutter/pubspec.yaml", PUBSPEC_YAML),
        FileRecord::marker("/notes"),
    ]);
    Registry::from_records(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_contain_every_anchor() {
        let reg = default_registry();
        for anchor in ANCHORS {
            assert!(reg.is_file(anchor), "missing {}", anchor);
        }
        assert_eq!(reg.records()[0].path, ANCHORS[0]);
    }

    #[test]
    fn empty_notes_dir_is_visible() {
        let reg = default_registry();
        assert!(reg.is_dir("/notes"));
    }
}
