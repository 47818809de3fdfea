mod client;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use protocol::input::{
    CanvasIdInput, CreateCanvasInput, CreateShapeInput, IdInput, RemoveCursorInput, UpdateCanvasInput,
    UpdateCursorInput, UpdateShapeInput,
};
use protocol::{Procedure, ShapeType, UserCursor};
use rand::Rng;
use serde_json::Value;

use crate::client::RpcClient;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {code} for {syscall}: {message}")]
    ServerError { syscall: String, code: String, message: String },
    #[error("unexpected reply frame for {0}")]
    UnexpectedReply(String),
    #[error("nothing to update for shape {0}; pass at least one field")]
    EmptyUpdate(i32),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "vectorboard", about = "Vectorboard RPC client")]
struct Cli {
    #[arg(long, env = "VECTORBOARD_URL", default_value = "http://127.0.0.1:2022")]
    base_url: String,

    /// Cursor identity; random when unset.
    #[arg(long, env = "VECTORBOARD_USER_ID")]
    user_id: Option<String>,

    /// Cursor label shown to other users; random when unset.
    #[arg(long, env = "VECTORBOARD_USER_NAME")]
    user_name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct Identity {
    user_id: String,
    user_name: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    Canvas(CanvasCommand),
    Shape(ShapeCommand),
    Cursor(CursorCommand),
    /// Poll other users' cursors until Ctrl-C.
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
struct CanvasCommand {
    #[command(subcommand)]
    command: CanvasSubcommand,
}

#[derive(Subcommand, Debug)]
enum CanvasSubcommand {
    List,
    Get {
        id: i32,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Update {
        id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long, default_value_t = false)]
        clear_description: bool,
    },
    Delete {
        id: i32,
    },
}

#[derive(Args, Debug)]
struct ShapeCommand {
    #[command(subcommand)]
    command: ShapeSubcommand,
}

#[derive(Subcommand, Debug)]
enum ShapeSubcommand {
    List {
        canvas_id: i32,
    },
    Create(ShapeCreateArgs),
    Update(ShapeUpdateArgs),
    Delete {
        id: i32,
        /// Re-fetch this canvas after deleting.
        #[arg(long)]
        reload: Option<i32>,
    },
}

#[derive(Args, Debug)]
struct ShapeCreateArgs {
    canvas_id: i32,
    #[arg(long = "type", value_parser = parse_shape_type, default_value = "rectangle")]
    kind: ShapeType,
    #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
    x: f64,
    #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
    y: f64,
    #[arg(long, default_value_t = 50.0)]
    width: f64,
    #[arg(long, default_value_t = 50.0)]
    height: f64,
    #[arg(long, default_value = "#3b82f6")]
    color: String,
    #[arg(long, allow_negative_numbers = true)]
    z_index: Option<i32>,
    /// Re-fetch the whole canvas afterwards.
    #[arg(long, default_value_t = false)]
    reload: bool,
}

#[derive(Args, Debug)]
struct ShapeUpdateArgs {
    id: i32,
    #[arg(long, allow_negative_numbers = true)]
    x: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    y: Option<f64>,
    #[arg(long)]
    width: Option<f64>,
    #[arg(long)]
    height: Option<f64>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    z_index: Option<i32>,
    /// Re-fetch the owning canvas afterwards.
    #[arg(long, default_value_t = false)]
    reload: bool,
}

#[derive(Args, Debug)]
struct CursorCommand {
    #[command(subcommand)]
    command: CursorSubcommand,
}

#[derive(Subcommand, Debug)]
enum CursorSubcommand {
    Move {
        canvas_id: i32,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    List {
        canvas_id: i32,
    },
    Remove {
        canvas_id: i32,
    },
}

#[derive(Args, Debug)]
struct WatchArgs {
    canvas_id: i32,
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Announce this position every tick so others can see the watcher.
    #[arg(long, allow_negative_numbers = true, requires = "y")]
    x: Option<f64>,
    #[arg(long, allow_negative_numbers = true, requires = "x")]
    y: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let client = RpcClient::new(&cli.base_url)?;
    let me = Identity {
        user_id: cli.user_id.unwrap_or_else(random_user_id),
        user_name: cli.user_name.unwrap_or_else(random_user_name),
    };

    match cli.command {
        Command::Ping => print_json(&client.call(Procedure::Healthcheck, &Value::Null).await?),
        Command::Canvas(canvas) => run_canvas(&client, canvas).await,
        Command::Shape(shape) => run_shape(&client, shape).await,
        Command::Cursor(cursor) => run_cursor(&client, &me, cursor).await,
        Command::Watch(args) => run_watch(&client, &me, args).await,
    }
}

async fn run_canvas(client: &RpcClient, canvas: CanvasCommand) -> Result<(), CliError> {
    let output = match canvas.command {
        CanvasSubcommand::List => client.call(Procedure::GetCanvases, &Value::Null).await?,
        CanvasSubcommand::Get { id } => client.call(Procedure::GetCanvas, &IdInput { id }).await?,
        CanvasSubcommand::Create { name, description } => {
            client
                .call(Procedure::CreateCanvas, &CreateCanvasInput { name, description })
                .await?
        }
        CanvasSubcommand::Update { id, name, description, clear_description } => {
            let description = if clear_description { Some(None) } else { description.map(Some) };
            client
                .call(Procedure::UpdateCanvas, &UpdateCanvasInput { id, name, description })
                .await?
        }
        CanvasSubcommand::Delete { id } => client.call(Procedure::DeleteCanvas, &IdInput { id }).await?,
    };
    print_json(&output)
}

async fn run_shape(client: &RpcClient, shape: ShapeCommand) -> Result<(), CliError> {
    match shape.command {
        ShapeSubcommand::List { canvas_id } => {
            print_json(&client.call(Procedure::GetShapes, &CanvasIdInput { canvas_id }).await?)
        }
        ShapeSubcommand::Create(args) => {
            let input = CreateShapeInput {
                canvas_id: args.canvas_id,
                kind: args.kind,
                x: args.x,
                y: args.y,
                width: args.width,
                height: args.height,
                color: args.color,
                z_index: args.z_index,
            };
            let created = client.call(Procedure::CreateShape, &input).await?;
            print_json(&created)?;
            if args.reload {
                reload_canvas(client, args.canvas_id).await?;
            }
            Ok(())
        }
        ShapeSubcommand::Update(args) => {
            let input = shape_update_input(&args);
            if input.is_empty() {
                return Err(CliError::EmptyUpdate(input.id));
            }
            let updated = client.call(Procedure::UpdateShape, &input).await?;
            print_json(&updated)?;
            if args.reload {
                if let Some(canvas_id) = canvas_id_of(&updated) {
                    reload_canvas(client, canvas_id).await?;
                }
            }
            Ok(())
        }
        ShapeSubcommand::Delete { id, reload } => {
            print_json(&client.call(Procedure::DeleteShape, &IdInput { id }).await?)?;
            if let Some(canvas_id) = reload {
                reload_canvas(client, canvas_id).await?;
            }
            Ok(())
        }
    }
}

async fn run_cursor(client: &RpcClient, me: &Identity, cursor: CursorCommand) -> Result<(), CliError> {
    let output = match cursor.command {
        CursorSubcommand::Move { canvas_id, x, y } => {
            client
                .call(Procedure::UpdateCursor, &cursor_at(me, canvas_id, x, y))
                .await?
        }
        CursorSubcommand::List { canvas_id } => {
            client.call(Procedure::GetCursors, &CanvasIdInput { canvas_id }).await?
        }
        CursorSubcommand::Remove { canvas_id } => {
            let input = RemoveCursorInput { canvas_id, user_id: me.user_id.clone() };
            client.call(Procedure::RemoveCursor, &input).await?
        }
    };
    print_json(&output)
}

/// Poll loop mirroring the browser client: fixed interval, no backoff, and
/// failures are only logged.
async fn run_watch(client: &RpcClient, me: &Identity, args: WatchArgs) -> Result<(), CliError> {
    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    eprintln!("watching canvas {} as {} ({})", args.canvas_id, me.user_name, me.user_id);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if let (Some(x), Some(y)) = (args.x, args.y) {
                    if let Err(e) = client.call(Procedure::UpdateCursor, &cursor_at(me, args.canvas_id, x, y)).await {
                        eprintln!("failed to update cursor: {e}");
                    }
                }
                match client
                    .call_as::<Vec<UserCursor>>(Procedure::GetCursors, &CanvasIdInput { canvas_id: args.canvas_id })
                    .await
                {
                    Ok(cursors) => print_cursors(&others(cursors, &me.user_id)),
                    Err(e) => eprintln!("failed to poll cursors: {e}"),
                }
            }
        }
    }

    let input = RemoveCursorInput { canvas_id: args.canvas_id, user_id: me.user_id.clone() };
    client.call(Procedure::RemoveCursor, &input).await?;
    eprintln!("removed cursor for {}", me.user_id);
    Ok(())
}

async fn reload_canvas(client: &RpcClient, canvas_id: i32) -> Result<(), CliError> {
    print_json(&client.call(Procedure::GetCanvas, &IdInput { id: canvas_id }).await?)
}

fn cursor_at(me: &Identity, canvas_id: i32, x: f64, y: f64) -> UpdateCursorInput {
    UpdateCursorInput { canvas_id, user_id: me.user_id.clone(), user_name: me.user_name.clone(), x, y }
}

fn canvas_id_of(shape: &Value) -> Option<i32> {
    shape
        .get("canvas_id")
        .and_then(Value::as_i64)
        .and_then(|id| i32::try_from(id).ok())
}

fn others(cursors: Vec<UserCursor>, user_id: &str) -> Vec<UserCursor> {
    cursors.into_iter().filter(|c| c.user_id != user_id).collect()
}

fn print_cursors(cursors: &[UserCursor]) {
    if cursors.is_empty() {
        println!("(no other cursors)");
        return;
    }
    for cursor in cursors {
        println!("{} ({}) at ({:.2}, {:.2})", cursor.user_name, cursor.user_id, cursor.x, cursor.y);
    }
}

fn parse_shape_type(value: &str) -> Result<ShapeType, String> {
    value.parse::<ShapeType>().map_err(|e| {
        let expected: Vec<String> = ShapeType::ALL.iter().map(ToString::to_string).collect();
        format!("{e}; expected one of {}", expected.join(", "))
    })
}

fn shape_update_input(args: &ShapeUpdateArgs) -> UpdateShapeInput {
    UpdateShapeInput {
        id: args.id,
        x: args.x,
        y: args.y,
        width: args.width,
        height: args.height,
        color: args.color.clone(),
        z_index: args.z_index,
    }
}

fn random_user_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect();
    format!("user_{suffix}")
}

fn random_user_name() -> String {
    format!("User {}", rand::rng().random_range(0..1000))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
