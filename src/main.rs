use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use troupe::api::types::{CourseQuery, Credentials, EntityId, FeedQuery, Post};
use troupe::api::{Notifier, RestClient, SilentNotifier, TracingNotifier};
use troupe::cache::{MemoryStorage, SessionStorage, SqliteStorage};
use troupe::config::Config;
use troupe::logging;
use troupe::stores::Stores;

#[derive(Parser, Debug)]
#[command(name = "troupe")]
#[command(about = "Command-line client for the troupe dance, fitness and heritage platform")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/troupe/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Do not report operation outcomes
  #[arg(short, long)]
  quiet: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Sign in and remember the session
  Login {
    username: String,
    /// Use the administrator login
    #[arg(long)]
    admin: bool,
    /// Password (default: $TROUPE_PASSWORD)
    #[arg(long)]
    password: Option<String>,
  },
  /// Sign out and forget the session
  Logout,
  /// Show the signed-in user
  Whoami,
  /// List courses, with favorites and progress when signed in
  Courses {
    #[arg(long)]
    difficulty: Option<String>,
    #[arg(long)]
    keyword: Option<String>,
  },
  /// Add a course to favorites, or remove it
  Favorite { id: EntityId },
  /// Show the social feed
  Feed {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
  },
  /// Like a post, or take the like back
  Like { id: EntityId },
  /// Show the comments of a post
  Comments { id: EntityId },
  /// Comment on a post
  Comment { id: EntityId, text: String },
  /// Show health records and active prescriptions
  Health,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;
  let _guard = logging::init(&config.log)?;

  let http = Arc::new(RestClient::new(&config.api.base_url, config.api.timeout())?);
  let storage: Arc<dyn SessionStorage> = if config.session.persist {
    let path = config.session.resolved_path()?;
    debug!(path = %path.display(), "using session database");
    Arc::new(SqliteStorage::open(&path, &config.api.base_url)?)
  } else {
    Arc::new(MemoryStorage::new())
  };
  let notifier: Arc<dyn Notifier> = if args.quiet {
    Arc::new(SilentNotifier)
  } else {
    Arc::new(TracingNotifier)
  };

  let stores = Stores::new(http, storage, notifier);
  stores.restore();

  run(&stores, args.command).await
}

async fn run(stores: &Stores<RestClient>, command: Command) -> Result<()> {
  match command {
    Command::Login {
      username,
      admin,
      password,
    } => {
      let password = match password {
        Some(p) => p,
        None => Config::get_password()?,
      };
      let credentials = Credentials {
        username,
        password,
        admin,
      };
      stores.session.login(&credentials).await?;
      println!("Signed in as {}", stores.session.nickname());
    }

    Command::Logout => {
      stores.logout().await;
      println!("Signed out");
    }

    Command::Whoami => {
      if !stores.session.is_logged_in() {
        println!("Not signed in");
        return Ok(());
      }
      match stores.fetch_user_info().await {
        Some(user) => {
          println!("{} ({})", stores.session.nickname(), user.username);
          if let Some(email) = &user.email {
            println!("email: {}", email);
          }
          println!("roles: {}", stores.session.roles().join(", "));
        }
        None => println!("Session expired, signed out"),
      }
    }

    Command::Courses {
      difficulty,
      keyword,
    } => {
      let query = CourseQuery {
        difficulty,
        keyword,
        ..Default::default()
      };
      if stores.session.is_logged_in() {
        futures::try_join!(
          stores.courses.fetch_courses(&query),
          stores.courses.fetch_favorites(),
          stores.courses.fetch_progress()
        )?;
      } else {
        stores.courses.fetch_courses(&query).await?;
      }

      for course in stores.courses.courses() {
        let star = if stores.courses.is_favorite(course.id) {
          "*"
        } else {
          " "
        };
        let progress = stores
          .courses
          .progress_of(course.id)
          .map(|p| format!("{:>3}%", p))
          .unwrap_or_default();
        println!(
          "{} {:>5}  {:<40} {:>4} min  {}",
          star, course.id, course.title, course.duration, progress
        );
      }
    }

    Command::Favorite { id } => {
      require_login(stores)?;
      let default_query = CourseQuery::default();
      futures::try_join!(
        stores.courses.fetch_courses(&default_query),
        stores.courses.fetch_favorites()
      )?;
      let added = stores.courses.toggle_favorite(id).await?;
      println!(
        "{} course {}",
        if added { "Favorited" } else { "Unfavorited" },
        id
      );
    }

    Command::Feed { page, limit } => {
      let query = FeedQuery {
        page,
        limit,
        ..Default::default()
      };
      for post in stores.social.fetch_feed(&query).await? {
        print_post(&post);
      }
    }

    Command::Like { id } => {
      require_login(stores)?;
      stores.social.fetch_feed(&FeedQuery::default()).await?;
      let liked = stores.social.toggle_like(id).await?;
      let likes = stores.social.post(id).map(|p| p.likes).unwrap_or_default();
      println!(
        "{} post {} ({} likes)",
        if liked { "Liked" } else { "Unliked" },
        id,
        likes
      );
    }

    Command::Comments { id } => {
      for comment in stores.social.fetch_comments(id).await? {
        let author = comment
          .user
          .as_ref()
          .map(|u| u.nickname.as_str())
          .filter(|n| !n.is_empty())
          .unwrap_or("anonymous");
        println!("{:>5}  {}  {}: {}", comment.id, comment.created_at, author, comment.content);
      }
    }

    Command::Comment { id, text } => {
      require_login(stores)?;
      stores.social.fetch_post(id).await?;
      let comment = stores.social.post_comment(id, &text).await?;
      println!("Comment {} posted", comment.id);
    }

    Command::Health => {
      require_login(stores)?;
      futures::try_join!(
        stores.health.fetch_records(),
        stores.health.fetch_prescriptions()
      )?;

      match stores.health.latest_record() {
        Some(r) => println!("Latest: {} {} {} on {}", r.kind, r.value, r.unit, r.date),
        None => println!("No health records"),
      }
      let active = stores.health.active_prescriptions();
      println!("{} active prescription(s)", active.len());
      for p in active {
        println!("{:>5}  {}  since {}", p.id, p.title, p.start_date);
      }
    }
  }

  Ok(())
}

fn require_login(stores: &Stores<RestClient>) -> Result<()> {
  if stores.session.is_logged_in() {
    Ok(())
  } else {
    Err(eyre!("Not signed in. Run `troupe login <username>` first."))
  }
}

fn print_post(post: &Post) {
  let author = post
    .user
    .as_ref()
    .map(|u| u.nickname.as_str())
    .filter(|n| !n.is_empty())
    .unwrap_or("anonymous");
  let heart = if post.is_liked { "+" } else { " " };
  println!(
    "{:>5} {} {}: {}  ({} likes, {} comments)",
    post.id, heart, author, post.content, post.likes, post.comment_count
  );
}
