//! End-to-end runs of every flavor over small fixture trees.

use std::fs;
use std::path::Path;

use dualgen::barrel::{regenerate_barrel, BarrelOptions};
use dualgen::config::Config;
use dualgen::output::FileAction;
use dualgen::pipeline::{project_annotations, remove_async, run_config, synthesize_enum_unions};
use dualgen::rules::AnnotationOptions;
use dualgen::types::WarningCode;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

const LOG_SOURCE: &str = "export const LogSourceEnum = {\n  CLIENT: 'client',\n  SERVER: 'server',\n};\n\nexport default LogSourceEnum;\n";

const CONNECTION: &str = "import request = require('then-request');\nimport sleep from './utils/sleep';\n\nexport default class Connection {\n  async get(url: string): Promise<string> {\n    await sleep(10);\n    const res = await request('GET', url);\n    return res.body;\n  }\n\n  async all(urls: string[]): Promise<Array<string>> {\n    return await Promise.all(urls.map((u) => this.get(u)));\n  }\n}\n";

const BARREL_PREFIX: &str =
    "// Public surface.\nimport Driver from './driver';\n\nexport {Driver};\n\n";

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(&src, "enums/log-source.ts", LOG_SOURCE);
    write(&src, "connection.ts", CONNECTION);
    write(&src, "driver.ts", "export default class Driver {}\n");
    write(&src, "base-client.ts", "export default class BaseClient {}\n");
    write(&src, "utils/sleep.ts", "export default async function sleep(ms: number): Promise<void> {}\n");
    write(&src, "index.ts", &format!("{}// BEGIN_GENERATED_CODE\n", BARREL_PREFIX));
    dir
}

mod sync_tree {
    use super::*;

    #[test]
    fn connection_becomes_blocking() {
        let dir = fixture();
        let out = dir.path().join("sync");
        remove_async(&dir.path().join("src"), &out, &[]).unwrap();

        assert_eq!(
            read(&out, "connection.ts"),
            "import request = require('sync-request');\nimport sleep from './utils/sleep-sync';\n\nexport default class Connection {\n  get(url: string): string {\n    sleep(10);\n    const res = request('GET', url);\n    return res.body;\n  }\n\n  all(urls: string[]): Array<string> {\n    return urls.map((u) => this.get(u));\n  }\n}\n"
        );
        assert_eq!(
            read(&out, "utils/sleep.ts"),
            "export default function sleep(ms: number): void {}\n"
        );
    }

    #[test]
    fn rerunning_on_the_output_changes_nothing() {
        let dir = fixture();
        let once = dir.path().join("once");
        let twice = dir.path().join("twice");
        remove_async(&dir.path().join("src"), &once, &[]).unwrap();
        remove_async(&once, &twice, &[]).unwrap();

        for rel in ["connection.ts", "utils/sleep.ts", "enums/log-source.ts", "index.ts"] {
            assert_eq!(read(&once, rel), read(&twice, rel), "{}", rel);
        }
    }

    #[test]
    fn remapped_literals_leave_no_trace() {
        let dir = fixture();
        let out = dir.path().join("sync");
        remove_async(&dir.path().join("src"), &out, &[]).unwrap();

        let text = read(&out, "connection.ts");
        assert!(!text.contains("'then-request'"));
        assert!(!text.contains("'./utils/sleep'"));
    }

    #[test]
    fn bare_promise_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.ts", "\nlet p: Promise;\n");

        let err = remove_async(&dir.path().join("src"), &dir.path().join("out"), &[]).unwrap_err();
        assert_eq!(err.kind(), "MissingTypeArgument");
        assert_eq!(err.location().unwrap().to_string(), "a.ts:2:8");
        assert_eq!(err.error_code().code(), 3);
    }

    #[test]
    fn extra_promise_arguments_warn() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.ts", "let p: Promise<string, number>;\n");

        let out = dir.path().join("out");
        let report = remove_async(&dir.path().join("src"), &out, &[]).unwrap();
        assert_eq!(read(&out, "a.ts"), "let p: string;\n");
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].code, WarningCode::MultipleTypeArguments);
    }
}

mod enum_tree {
    use super::*;

    #[test]
    fn log_source_gets_a_union() {
        let dir = fixture();
        let out = dir.path().join("lib");
        synthesize_enum_unions(&dir.path().join("src"), &out, &[]).unwrap();

        assert_eq!(
            read(&out, "enums/log-source.ts"),
            "export type LogSource = 'client' | 'server';\nexport const LogSourceEnum = {\n  CLIENT: 'client' as 'client',\n  SERVER: 'server' as 'server',\n};\n\nexport default LogSourceEnum;\n"
        );
        assert_eq!(read(&out, "connection.ts"), CONNECTION);
    }

    #[test]
    fn shapes_are_rejected() {
        let cases = [
            ("export const AEnum = {};\n", "EmptyEnum"),
            ("export const AEnum = {A: {}};\n", "NonLiteralValue"),
            ("export const AEnum = 5;\n", "NotAnObjectLiteral"),
        ];
        for (source, expected) in cases {
            let dir = TempDir::new().unwrap();
            write(dir.path(), "src/a.ts", source);
            let err = synthesize_enum_unions(&dir.path().join("src"), &dir.path().join("lib"), &[])
                .unwrap_err();
            assert_eq!(err.kind(), "ShapeError", "{}", source);
            assert!(err.to_string().starts_with(expected), "{}: {}", source, err);
        }
    }
}

mod annotated_tree {
    use super::*;

    #[test]
    fn every_file_gets_the_directive() {
        let dir = fixture();
        let out = dir.path().join("flow");
        let report = project_annotations(
            &dir.path().join("src"),
            &out,
            &[],
            &AnnotationOptions::default(),
        )
        .unwrap();

        assert_eq!(report.count(FileAction::Written), 6);
        assert!(read(&out, "connection.ts")
            .starts_with("// @flow\nimport request from 'then-request';\n"));
        assert!(read(&out, "driver.ts").starts_with("// @flow\n"));
    }
}

mod barrel_file {
    use super::*;

    #[test]
    fn exports_connection_and_log_source() {
        let dir = fixture();
        let src = dir.path().join("src");
        let target = src.join("index.ts");
        let report = regenerate_barrel(&target, &src, &BarrelOptions::default()).unwrap();

        assert_eq!(report.files[0].action, FileAction::Written);
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            format!(
                "{}// BEGIN_GENERATED_CODE\nimport Connection from './connection';\nimport LogSource from './enums/log-source';\n\nexport {{\n  Connection,\n  LogSource,\n}};\n",
                BARREL_PREFIX
            )
        );
    }

    #[test]
    fn regeneration_is_byte_stable() {
        let dir = fixture();
        let src = dir.path().join("src");
        let target = src.join("index.ts");
        let first = regenerate_barrel(&target, &src, &BarrelOptions::default()).unwrap();
        let text = fs::read_to_string(&target).unwrap();
        let second = regenerate_barrel(&target, &src, &BarrelOptions::default()).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), text);
        assert_eq!(second.files[0].action, FileAction::Unchanged);
        assert_eq!(first.files[0].sha256, second.files[0].sha256);
    }

    #[test]
    fn duplicate_exports_collide() {
        let dir = fixture();
        let src = dir.path().join("src");
        write(&src, "enums/connection.ts", "export const ConnectionEnum = {A: 'a'};\n");

        let err = regenerate_barrel(&src.join("index.ts"), &src, &BarrelOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), "NameCollisionError");
    }
}

mod config_file {
    use super::*;

    #[test]
    fn build_runs_every_section() {
        let dir = fixture();
        write(
            dir.path(),
            "dualgen.toml",
            r#"
[sync]
source = "src"
destination = "sync/src"
exclude = ["index.ts"]

[annotations]
source = "src"
destination = "flow"

[enums]
source = "src"
destination = "lib"

[[barrel]]
target = "src/index.ts"
source = "src"
"#,
        );

        let config = Config::load(&dir.path().join("dualgen.toml")).unwrap();
        let reports = run_config(&config).unwrap();
        let flavors: Vec<&str> = reports.iter().map(|r| r.flavor.as_str()).collect();
        assert_eq!(flavors, vec!["sync", "annotations", "enums", "barrel"]);

        assert!(!dir.path().join("sync/src/index.ts").exists());
        assert!(dir.path().join("sync/src/connection.ts").exists());
        assert!(dir.path().join("flow/connection.ts").exists());
        assert!(dir.path().join("lib/enums/log-source.ts").exists());
        assert!(read(dir.path(), "src/index.ts").contains("  LogSource,\n"));
    }
}
