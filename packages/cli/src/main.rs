//! `hearth`: command-line client for a Hearth server.
//!
//! Identity is an Ed25519 seed. `hearth keygen` prints a fresh seed and its
//! public key; `hearth register` creates an account bound to that key and
//! prints the new user id. Export both to sign every later call:
//!
//! ```text
//! export HEARTH_SEED=$(hearth keygen --seed-only)
//! hearth register "Ada Lovelace" ada@example.com
//! export HEARTH_USER=<printed id>
//! hearth friends request <other-id>
//! ```

mod client;

use std::process;

use clap::{Parser, Subcommand};
use hearth::render::{render_post, render_posts, render_profiles, render_relationship, render_user};
use hearth::{Comment, Identity, Post, ProfileView, User};
use hearth_api::{
    CommentRequest, CreatePostRequest, Envelope, PostQuery, RegisterRequest,
    RelationshipResponse, SearchQuery,
};
use reqwest::Method;
use serde_json::Value;

use client::{Client, ClientError, Credentials};

/// hearth: Hearth social-network CLI
///
/// Register, manage friends, and post against a Hearth server.
#[derive(Parser)]
#[command(name = "hearth", version, about, long_about = None)]
struct Cli {
    /// Base URL of the server.
    #[arg(long, env = "HEARTH_URL", default_value = "http://localhost:3000", global = true)]
    url: String,

    /// Your user id, used as the signature keyId.
    #[arg(long, env = "HEARTH_USER", global = true)]
    user: Option<String>,

    /// Your 32-byte Ed25519 seed, hex-encoded.
    #[arg(long, env = "HEARTH_SEED", global = true, hide_env_values = true)]
    seed: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new signing key.
    Keygen {
        /// Print only the hex seed.
        #[arg(long)]
        seed_only: bool,
    },

    /// Create an account bound to the key in HEARTH_SEED.
    Register {
        name: String,
        email: String,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },

    /// Show your own profile.
    Whoami,

    /// Show a user's profile.
    User { id: String },

    /// Search users by name or email.
    Search {
        query: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Friends and friend requests.
    #[command(subcommand)]
    Friends(FriendsCommand),

    /// Posts and comments.
    #[command(subcommand)]
    Post(PostCommand),
}

#[derive(Subcommand)]
enum FriendsCommand {
    /// List your friends.
    List,
    /// List requests waiting for your answer.
    Requests,
    /// Show how you relate to another user.
    Status { user: String },
    /// Send a friend request.
    Request { user: String },
    /// Accept a request from USER.
    Accept { user: String },
    /// Reject a request from USER.
    Reject { user: String },
    /// Unfriend USER.
    Remove { user: String },
}

#[derive(Subcommand)]
enum PostCommand {
    /// Publish a post.
    Create {
        text: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// List posts, newest first.
    List {
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        before: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Posts by you and your friends.
    Feed {
        #[arg(long)]
        before: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show a post with its comments.
    Show { id: String },
    /// Delete one of your posts.
    Delete { id: String },
    /// Like a post.
    Like { id: String },
    /// Remove your like from a post.
    Unlike { id: String },
    /// Comment on a post.
    Comment { id: String, text: String },
}

fn main() {
    let cli = Cli::parse();

    if let Command::Keygen { seed_only } = cli.command {
        cmd_keygen(seed_only);
        return;
    }

    let identity = cli
        .seed
        .as_deref()
        .map(|s| Identity::from_seed_hex(s).unwrap_or_else(|e| fatal(&format!("HEARTH_SEED: {e}"))));
    let credentials = match (cli.user.clone(), identity.clone()) {
        (Some(user_id), Some(identity)) => Some(Credentials { user_id, identity }),
        _ => None,
    };
    let client = Client::new(&cli.url, credentials).unwrap_or_else(|e| fatal(&e.to_string()));

    let result = match cli.command {
        Command::Keygen { .. } => Ok(()),
        Command::Register {
            name,
            email,
            bio,
            location,
        } => {
            let identity = identity.unwrap_or_else(|| fatal("register needs HEARTH_SEED"));
            cmd_register(&client, &identity, name, email, bio, location)
        }
        Command::Whoami => show_user(&client, "/users/me", true),
        Command::User { id } => show_user(&client, &format!("/users/{id}"), false),
        Command::Search { query, limit } => cmd_search(&client, query, limit),
        Command::Friends(cmd) => cmd_friends(&client, cmd),
        Command::Post(cmd) => cmd_post(&client, cmd),
    };

    if let Err(e) = result {
        eprintln!("hearth: {e}");
        process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// keygen / register / users
// ---------------------------------------------------------------------------

fn cmd_keygen(seed_only: bool) {
    let identity = Identity::generate();
    if seed_only {
        println!("{}", identity.seed_hex());
    } else {
        println!("seed:       {}", identity.seed_hex());
        println!("public key: {}", identity.public_key_multibase());
    }
}

fn cmd_register(
    client: &Client,
    identity: &Identity,
    name: String,
    email: String,
    bio: Option<String>,
    location: Option<String>,
) -> Result<(), ClientError> {
    let req = RegisterRequest {
        name,
        email,
        public_key: identity.public_key_multibase(),
        bio,
        location,
        profile_picture: None,
        cover_picture: None,
    };
    let env: Envelope<User> = client.post_unsigned("/users", &req)?;
    print!("{}", render_user(&env.data));
    println!("\nexport HEARTH_USER={}", env.data.id);
    Ok(())
}

fn show_user(client: &Client, path: &str, signed: bool) -> Result<(), ClientError> {
    let env: Envelope<User> = if signed {
        client.signed(Method::GET, path, None::<&()>, None::<&()>)?
    } else {
        client.get(path)?
    };
    print!("{}", render_user(&env.data));
    Ok(())
}

fn cmd_search(client: &Client, q: Option<String>, limit: Option<u32>) -> Result<(), ClientError> {
    let env: Envelope<Vec<ProfileView>> = client.get_query("/users", &SearchQuery { q, limit })?;
    print!("{}", render_profiles("Users", &env.data));
    Ok(())
}

// ---------------------------------------------------------------------------
// friends
// ---------------------------------------------------------------------------

fn cmd_friends(client: &Client, cmd: FriendsCommand) -> Result<(), ClientError> {
    let (method, path, done) = match cmd {
        FriendsCommand::List => return list_profiles(client, "/friends", "Friends"),
        FriendsCommand::Requests => {
            return list_profiles(client, "/friends/requests", "Friend requests")
        }
        FriendsCommand::Status { user } => {
            let env: Envelope<RelationshipResponse> = client.signed(
                Method::GET,
                &format!("/friends/status/{user}"),
                None::<&()>,
                None::<&()>,
            )?;
            print!("{}", render_relationship(&env.data.user, env.data.relationship));
            return Ok(());
        }
        FriendsCommand::Request { user } => (
            Method::POST,
            format!("/friends/request/{user}"),
            format!("friend request sent to {user}"),
        ),
        FriendsCommand::Accept { user } => (
            Method::PUT,
            format!("/friends/accept/{user}"),
            format!("you are now friends with {user}"),
        ),
        FriendsCommand::Reject { user } => (
            Method::PUT,
            format!("/friends/reject/{user}"),
            format!("rejected request from {user}"),
        ),
        FriendsCommand::Remove { user } => (
            Method::DELETE,
            format!("/friends/{user}"),
            format!("removed {user} from your friends"),
        ),
    };
    let _: Envelope<Value> = client.signed(method, &path, None::<&()>, None::<&()>)?;
    println!("{done}");
    Ok(())
}

fn list_profiles(client: &Client, path: &str, title: &str) -> Result<(), ClientError> {
    let env: Envelope<Vec<ProfileView>> =
        client.signed(Method::GET, path, None::<&()>, None::<&()>)?;
    print!("{}", render_profiles(title, &env.data));
    Ok(())
}

// ---------------------------------------------------------------------------
// posts
// ---------------------------------------------------------------------------

fn cmd_post(client: &Client, cmd: PostCommand) -> Result<(), ClientError> {
    match cmd {
        PostCommand::Create { text, image } => {
            let env: Envelope<Post> = client.signed(
                Method::POST,
                "/posts",
                None::<&()>,
                Some(&CreatePostRequest { text, image }),
            )?;
            print!("{}", render_post(&env.data, &[]));
        }
        PostCommand::List {
            author,
            before,
            limit,
        } => {
            let query = PostQuery {
                author,
                before,
                limit,
            };
            let env: Envelope<Vec<Post>> = client.get_query("/posts", &query)?;
            print!("{}", render_posts(&env.data));
        }
        PostCommand::Feed { before, limit } => {
            let query = PostQuery {
                author: None,
                before,
                limit,
            };
            let env: Envelope<Vec<Post>> =
                client.signed(Method::GET, "/posts/feed", Some(&query), None::<&()>)?;
            print!("{}", render_posts(&env.data));
        }
        PostCommand::Show { id } => {
            let post: Envelope<Post> = client.get(&format!("/posts/{id}"))?;
            let comments: Envelope<Vec<Comment>> = client.get(&format!("/posts/{id}/comments"))?;
            print!("{}", render_post(&post.data, &comments.data));
        }
        PostCommand::Delete { id } => {
            let _: Envelope<Value> =
                client.signed(Method::DELETE, &format!("/posts/{id}"), None::<&()>, None::<&()>)?;
            println!("deleted post {id}");
        }
        PostCommand::Like { id } => set_like(client, &id, Method::PUT)?,
        PostCommand::Unlike { id } => set_like(client, &id, Method::DELETE)?,
        PostCommand::Comment { id, text } => {
            let env: Envelope<Comment> = client.signed(
                Method::POST,
                &format!("/posts/{id}/comments"),
                None::<&()>,
                Some(&CommentRequest { text }),
            )?;
            println!("comment {} added to post {id}", env.data.id);
        }
    }
    Ok(())
}

fn set_like(client: &Client, id: &str, method: Method) -> Result<(), ClientError> {
    let env: Envelope<Post> =
        client.signed(method, &format!("/posts/{id}/like"), None::<&()>, None::<&()>)?;
    print!("{}", render_post(&env.data, &[]));
    Ok(())
}

/// Print an error to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("hearth: {msg}");
    process::exit(2);
}
