use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::app::session::{Mode, Session};
use crate::app::store::{LocalFsProfileStore, ProfileStore as _};
use crate::classify::{self, QuizStep};
use crate::cli::{
    CheckArgs, MindmapArgs, NarrateArgs, ProfilesSaveArgs, QuizArgs, TransformArgs, ValidateArgs,
};
use crate::document::TransformedDocument;
use crate::generator::{Generator as _, GeneratorConfig, HttpGenerator};
use crate::mindmap::{self, MindmapIndex};
use crate::profile::Profile;
use crate::schema;
use crate::settings::{Settings, SettingsChange};

pub fn quiz(args: QuizArgs) -> anyhow::Result<()> {
    let questions = classify::sorting_ceremony();
    if args.answers.len() > questions.len() {
        tracing::warn!(
            answers = args.answers.len(),
            questions = questions.len(),
            "extra answers ignored"
        );
    }
    let classification = classify::classify(&questions, &args.answers);
    let profile = classification.profile;

    println!("{} ({profile})", profile.faction_name());
    println!(
        "colorblind: {}",
        if classification.color_blind { "yes" } else { "no" }
    );
    for (scored, points) in classification.scores.entries() {
        println!("  {scored}: {points}");
    }
    println!("{}", profile.faction_description());
    Ok(())
}

pub fn validate(args: ValidateArgs) -> anyhow::Result<()> {
    let document = read_document(Path::new(&args.input))?;
    println!(
        "ok: {:?} ({} blocks, {} slides, {} activities, {} mindmap nodes, {} flashcards)",
        document.title,
        document.blocks.len(),
        document.slides.len(),
        document.activities.len(),
        document.mindmap.len(),
        document.flashcards.len(),
    );
    for warning in document.lint() {
        println!("warning: {warning}");
    }
    Ok(())
}

pub async fn transform(args: TransformArgs, data_dir: &str) -> anyhow::Result<()> {
    let input = Path::new(&args.input);
    let out = Path::new(&args.out);
    if out.exists() {
        anyhow::bail!("document output already exists: {}", out.display());
    }

    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("read artifact: {}", input.display()))?;
    let mime_type = match args.mime_type.as_deref() {
        Some(mime_type) => mime_type.to_owned(),
        None => guess_mime_type(input)
            .with_context(|| format!("cannot guess MIME type of {}; pass --mime-type", input.display()))?
            .to_owned(),
    };

    let generator = HttpGenerator::new(GeneratorConfig::from_env()?)?;
    let store = LocalFsProfileStore::new(data_dir);
    let mut session = Session::open(Arc::new(generator), Arc::new(store)).await;
    session.capture(bytes, &mime_type)?;

    if let Some(answers) = args.answers.as_deref() {
        if session.mode() == Mode::SelectProfile {
            session.start_quiz()?;
        }
        let mut finished = false;
        for answer in answers {
            if let QuizStep::Finished(_) = session.answer_quiz(*answer).await? {
                finished = true;
                break;
            }
        }
        if !finished {
            let classification = session
                .quiz()
                .map(|quiz| quiz.finish(false))
                .context("quiz ended without a result")?;
            session.complete_quiz(&classification).await?;
        }
    } else if let Some(raw) = args.profile.as_deref() {
        let profile = Profile::parse(raw)?;
        if session.mode() == Mode::Quiz {
            session.cancel_quiz()?;
        }
        session.select_profile(profile).await?;
    } else if let Some(id) = args.saved.as_deref() {
        if session.mode() != Mode::SelectProfile {
            anyhow::bail!("no saved profiles in {data_dir}");
        }
        session.select_saved(id).await?;
    }

    let document = session
        .document()
        .context("generator produced no document")?;
    for warning in session.warnings() {
        tracing::warn!(%warning, "document lint");
    }
    let data = serde_json::to_vec_pretty(document).context("serialize document")?;
    tokio::fs::write(out, data)
        .await
        .with_context(|| format!("write document: {}", out.display()))?;

    let settings = session.settings();
    println!(
        "wrote {} ({:?}) for {}",
        out.display(),
        document.title,
        settings.name
    );
    Ok(())
}

pub fn mindmap(args: MindmapArgs) -> anyhow::Result<()> {
    let document = read_document(Path::new(&args.doc))?;
    let index = MindmapIndex::build(&document.mindmap);
    for pos in index.orphans() {
        if let Some(node) = document.mindmap.get(*pos) {
            tracing::warn!(id = %node.id, parent_id = ?node.parent_id, "unreachable mindmap node");
        }
    }
    print!("{}", mindmap::render_outline(&index.forest(&document.mindmap)));
    Ok(())
}

pub fn check(args: CheckArgs) -> anyhow::Result<()> {
    let document = read_document(Path::new(&args.doc))?;
    let activity = document
        .activity(&args.activity)
        .with_context(|| format!("unknown activity: {}", args.activity))?;
    let verdict = crate::verify::verify_activity(activity, &args.answer);
    if verdict.is_correct() {
        println!("correct ({verdict:?})");
    } else {
        println!("incorrect");
    }
    Ok(())
}

pub async fn profiles_list(data_dir: &str) -> anyhow::Result<()> {
    let profiles = LocalFsProfileStore::new(data_dir).load().await;
    if profiles.is_empty() {
        println!("no saved profiles");
        return Ok(());
    }
    for settings in profiles {
        println!(
            "{}\t{}\t{}",
            settings.id, settings.name, settings.base_profile
        );
    }
    Ok(())
}

pub async fn profiles_save(args: ProfilesSaveArgs, data_dir: &str) -> anyhow::Result<()> {
    let profile = Profile::parse(&args.profile)?;
    let mut settings = Settings::for_profile(profile);
    if args.dark {
        settings = settings.toggled_dark_mode();
    }
    if let Some(speed) = args.speed {
        settings = settings.with(SettingsChange::NarrationSpeed(speed))?;
    }
    let store = LocalFsProfileStore::new(data_dir);
    let existing = store.load().await;
    let updated = store.append_snapshot(&existing, &settings, &args.name).await?;
    if let Some(snapshot) = updated.last() {
        println!("saved {} ({})", snapshot.name, snapshot.id);
    }
    Ok(())
}

pub async fn narrate(args: NarrateArgs) -> anyhow::Result<()> {
    let out = Path::new(&args.out);
    if out.exists() {
        anyhow::bail!("narration output already exists: {}", out.display());
    }
    let generator = HttpGenerator::new(GeneratorConfig::from_env()?)?;
    let clip = generator.narrate(&args.text).await?;
    tokio::fs::write(out, clip.to_f32_le_bytes())
        .await
        .with_context(|| format!("write narration: {}", out.display()))?;
    println!(
        "wrote {} samples ({:.2}s at {} Hz) to {}",
        clip.samples.len(),
        clip.duration().as_secs_f64(),
        clip.sample_rate,
        out.display()
    );
    Ok(())
}

fn read_document(path: &Path) -> anyhow::Result<TransformedDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read document: {}", path.display()))?;
    schema::parse_document(&raw).with_context(|| format!("invalid document: {}", path.display()))
}

fn guess_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime_type = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        _ => return None,
    };
    Some(mime_type)
}
