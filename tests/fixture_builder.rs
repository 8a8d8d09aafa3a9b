//! End-to-end fixture loading against a file-configured SQLite database.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use seedbed::{
    CleanerOptions, ConnectionCache, DatabaseConn, Error, FixtureBlueprint, FixtureBuilder,
    SeedbedConfig,
};
use serde_json::json;

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (id INTEGER PRIMARY KEY, first_name TEXT, last_name TEXT)",
    "CREATE TABLE blogs (id INTEGER PRIMARY KEY, name TEXT, user_id INTEGER)",
    "CREATE TABLE posts (id INTEGER PRIMARY KEY, blog_id INTEGER, title TEXT, body TEXT)",
    "CREATE TABLE comments (id INTEGER PRIMARY KEY, post_id INTEGER, user_id INTEGER, body TEXT)",
];

const USERS: &str = "\
luke:
  id: 1
  first_name: Luke
  last_name: Skywalker
leia:
  id: 2
  first_name: Leia
  last_name: Organa
han:
  id: 3
  first_name: Han
  last_name: Solo
";

const BLOGS: &str = "\
jedi_path:
  id: 1
  name: The Jedi Path
  user_id: 1
rebel_news:
  id: 2
  name: Rebel News
  user_id: 2
";

const POSTS: &str = "\
first:
  id: 1
  blog_id: 1
  title: Moisture farming
  body: It's not as bad as it sounds.
second:
  id: 2
  blog_id: 1
  title: Power converters
second_blog:
  id: 3
  blog_id: 2
  title: Death Star plans
  body: |
    Delivered.
";

const COMMENTS: &str = "\
nerf_herder:
  id: 1
  post_id: 3
  user_id: 3
  body: Who's scruffy-looking?
";

struct Project {
    root: tempfile::TempDir,
}

impl Project {
    /// A project with `config/database.yml` keyed by environment and a
    /// `spec/fixtures/blog` fixture group.
    fn new() -> Self {
        let project = Self {
            root: tempfile::tempdir().unwrap(),
        };

        fs::create_dir_all(project.path("db")).unwrap();
        let db = DatabaseConn::open_path(project.db_path().to_str().unwrap()).unwrap();
        for sql in SCHEMA {
            db.execute(sql).unwrap();
        }

        fs::create_dir_all(project.path("config")).unwrap();
        fs::write(
            project.config_path(),
            format!(
                "development:\n  adapter: postgres\n  database: blog_dev\n  username: dev\n\
                 test:\n  adapter: sqlite\n  database: {}\n  username: root\n  password:\n",
                project.db_path().display()
            ),
        )
        .unwrap();

        let fixtures = project.fixture_dir();
        fs::create_dir_all(&fixtures).unwrap();
        fs::write(fixtures.join("users.yml"), USERS).unwrap();
        fs::write(fixtures.join("blogs.yml"), BLOGS).unwrap();
        fs::write(fixtures.join("posts.yml"), POSTS).unwrap();
        fs::write(fixtures.join("comments.yml"), COMMENTS).unwrap();

        project
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    fn db_path(&self) -> PathBuf {
        self.path("db/test.sqlite3")
    }

    fn config_path(&self) -> PathBuf {
        self.path("config/database.yml")
    }

    fn fixture_dir(&self) -> PathBuf {
        self.path("spec/fixtures/blog")
    }

    fn settings(&self) -> SeedbedConfig {
        SeedbedConfig {
            database_config: self.config_path().to_string_lossy().into_owned(),
            fixture_directories: vec![
                self.path("spec/fixtures").to_string_lossy().into_owned(),
                self.path("test/fixtures").to_string_lossy().into_owned(),
            ],
            ..SeedbedConfig::default()
        }
    }

    fn builder(&self) -> FixtureBuilder {
        let blueprint =
            FixtureBlueprint::new(Arc::new(ConnectionCache::new())).with_settings(self.settings());
        FixtureBuilder::new(blueprint)
            .unwrap()
            .with_database_config(self.config_path())
            .unwrap()
            .with_fixture_directory(self.fixture_dir())
            .unwrap()
    }

    fn verify(&self) -> DatabaseConn {
        DatabaseConn::open_path(self.db_path().to_str().unwrap()).unwrap()
    }

    fn exists(&self, table: &str, id: i64) -> bool {
        let count: i64 = self
            .verify()
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", table),
                [id],
                |row| row.get(0),
            )
            .unwrap();
        count > 0
    }
}

fn count(db: &DatabaseConn, table: &str) -> u64 {
    db.table_count(table).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_loads_fixtures_into_clean_database() {
    init_tracing();
    let project = Project::new();
    project
        .verify()
        .execute("INSERT INTO users (id, first_name) VALUES (1337, 'Unfixtured')")
        .unwrap();

    let fixtures = project.builder().build().unwrap();

    assert_eq!(fixtures.count("users"), 3);
    assert_eq!(fixtures.count("blogs"), 2);
    assert_eq!(fixtures.count("posts"), 3);
    assert_eq!(fixtures.count("comments"), 1);

    let db = project.verify();
    assert_eq!(count(&db, "users"), 3);
    assert_eq!(count(&db, "blogs"), 2);
    assert_eq!(count(&db, "posts"), 3);
    assert_eq!(count(&db, "comments"), 1);
    assert!(!project.exists("users", 1337));

    let title: String = db
        .conn
        .query_row("SELECT title FROM posts WHERE id = 3", [], |row| row.get(0))
        .unwrap();
    assert_eq!(title, "Death Star plans");
}

#[test]
fn test_default_settings_paths() {
    let project = Project::new();
    let blueprint =
        FixtureBlueprint::new(Arc::new(ConnectionCache::new())).with_settings(project.settings());

    // no options at all: settings decide the config file and the directory
    let builder = FixtureBuilder::new(blueprint).unwrap();
    assert_eq!(
        builder.path_to_fixtures().unwrap(),
        project.path("spec/fixtures").as_path()
    );

    let shared = builder.connection().unwrap();
    assert_eq!(count(&shared.lock(), "users"), 0);
}

#[test]
fn test_result_is_loaded_once() {
    let project = Project::new();
    let builder = project.builder();

    assert_eq!(builder.result().unwrap().count("users"), 3);

    project
        .verify()
        .execute("INSERT INTO users (id, first_name) VALUES (1337, 'Late')")
        .unwrap();
    builder.result().unwrap();
    assert!(project.exists("users", 1337));

    // a refined builder runs again and cleans
    builder
        .with_database_cleaner_options(CleanerOptions::default())
        .unwrap()
        .result()
        .unwrap();
    assert!(!project.exists("users", 1337));
}

#[test]
fn test_invalid_config_file_reports_missing_fields() {
    let project = Project::new();
    project
        .verify()
        .execute("INSERT INTO users (id, first_name) VALUES (1337, 'Unfixtured')")
        .unwrap();

    let invalid = project.path("config/invalid.yml");
    fs::write(&invalid, "anything_but_test:\n  adapter: sqlite\n").unwrap();

    let err = project
        .builder()
        .with_database_config(invalid.as_path())
        .unwrap()
        .build()
        .unwrap_err();

    assert!(matches!(err, Error::DatabaseNotConfigured(_)));
    assert_eq!(
        err.to_string(),
        "Unable to connect to database: Missing config for adapter, database, username"
    );
    assert!(project.exists("users", 1337));
}

#[test]
fn test_inline_config() {
    let project = Project::new();
    let inline = json!({
        ":test": {
            ":adapter": "sqlite3",
            ":database": project.db_path().to_str().unwrap(),
            ":username": "root"
        }
    });

    let builder = project
        .builder()
        .with(seedbed::fixtures::DATABASE_CONFIG, inline)
        .unwrap();
    let fixtures = builder.build().unwrap();
    assert_eq!(fixtures.count("comments"), 1);
    assert_eq!(
        fixtures
            .row("users", "han")
            .and_then(|row| row.get("last_name")),
        Some(&json!("Solo"))
    );
}

#[test]
fn test_unsupported_adapter() {
    let project = Project::new();
    let config = project.path("config/postgres.yml");
    fs::write(
        &config,
        "test:\n  adapter: postgresql\n  database: blog_test\n  username: root\n",
    )
    .unwrap();

    let err = project
        .builder()
        .with_database_config(config.as_path())
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Connection { .. }));
}

#[test]
fn test_fixture_directory_must_exist() {
    let project = Project::new();
    let err = project
        .builder()
        .with_fixture_directory(Path::new("/definitely/not/here"))
        .unwrap()
        .build()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid fixture directory /definitely/not/here"
    );
}

#[test]
fn test_templated_fixtures() {
    let project = Project::new();
    fs::write(
        project.fixture_dir().join("users.yml"),
        "luke:\n  id: {{ 1 }}\n  first_name: Luke\n  last_name: {{ \"Sky\" ~ \"walker\" }}\n\
         anakin:\n  id: {{ 1 + 1 }}\n  first_name: Anakin\n  last_name: {{ \"Sky\" ~ \"walker\" }}\n\
         han:\n  id: {{ 2 + 1 }}\n  first_name: Han\n  last_name: Solo\n",
    )
    .unwrap();

    project.builder().build().unwrap();

    let skywalkers: i64 = project
        .verify()
        .conn
        .query_row(
            "SELECT COUNT(*) FROM users WHERE last_name = 'Skywalker'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(skywalkers, 2);
    assert!(project.exists("users", 3));
}
