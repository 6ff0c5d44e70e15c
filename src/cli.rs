use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding saved profiles.
    #[arg(long, global = true, env = "REFORMAT_DATA_DIR", default_value = ".reformat")]
    pub data_dir: String,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the sorting ceremony with pre-chosen answers.
    Quiz(QuizArgs),
    /// Check a generator payload against the content model.
    Validate(ValidateArgs),
    /// Send an artifact to the generator and save the resulting document.
    Transform(TransformArgs),
    /// Print the concept map of a document as an outline.
    Mindmap(MindmapArgs),
    /// Grade an answer to one of a document's activities.
    Check(CheckArgs),
    /// Manage saved profiles.
    Profiles {
        #[command(subcommand)]
        command: ProfilesCommand,
    },
    /// Synthesize narration and write it as f32 little-endian samples.
    Narrate(NarrateArgs),
}

#[derive(Debug, Args)]
pub struct QuizArgs {
    /// Zero-based option per question, comma separated (e.g. `0,2,1,0,1`).
    #[arg(long, value_delimiter = ',', required = true)]
    pub answers: Vec<usize>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Generator payload (JSON).
    #[arg(long)]
    pub input: String,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("choice").required(true).args(["profile", "answers", "saved"])))]
pub struct TransformArgs {
    /// Artifact to transform (image, PDF, or text).
    #[arg(long)]
    pub input: String,

    /// MIME type of the artifact (default: guessed from the extension).
    #[arg(long)]
    pub mime_type: Option<String>,

    /// Profile picked by hand (dyslexia, dyscalculia, adhd, ell, autism, custom).
    #[arg(long)]
    pub profile: Option<String>,

    /// Take the sorting ceremony with these answers instead.
    #[arg(long, value_delimiter = ',')]
    pub answers: Option<Vec<usize>>,

    /// Id of a saved profile.
    #[arg(long)]
    pub saved: Option<String>,

    /// Output path for the document JSON.
    #[arg(long)]
    pub out: String,
}

#[derive(Debug, Args)]
pub struct MindmapArgs {
    /// Document JSON (written by `transform`).
    #[arg(long)]
    pub doc: String,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Document JSON (written by `transform`).
    #[arg(long)]
    pub doc: String,

    /// Activity id.
    #[arg(long)]
    pub activity: String,

    /// The learner's chosen option.
    #[arg(long)]
    pub answer: String,
}

#[derive(Debug, Subcommand)]
pub enum ProfilesCommand {
    /// List saved profiles.
    List,
    /// Save the default bundle of a profile under a name.
    Save(ProfilesSaveArgs),
}

#[derive(Debug, Args)]
pub struct ProfilesSaveArgs {
    /// Display name for the saved profile.
    #[arg(long)]
    pub name: String,

    /// Base profile (dyslexia, dyscalculia, adhd, ell, autism, custom).
    #[arg(long)]
    pub profile: String,

    /// Store the dark theme instead of the profile's default.
    #[arg(long)]
    pub dark: bool,

    /// Narration speed multiplier.
    #[arg(long)]
    pub speed: Option<f32>,
}

#[derive(Debug, Args)]
pub struct NarrateArgs {
    /// Text to narrate.
    #[arg(long)]
    pub text: String,

    /// Output path for raw samples.
    #[arg(long)]
    pub out: String,
}
