//! Line-delimited JSON over stdio.
//!
//! Each input line is one `{"type", "payload"}` envelope. Every line gets
//! exactly one reply; committed sequences are written as they arrive.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::buffer::CommittedSequence;
use crate::config::PipelineConfig;
use crate::pipeline::{ChannelTranslator, Inbound, LogTranslator, Outbound, Pipeline, Translator};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Serve stdin/stdout until stdin closes.
pub async fn serve_stdio(config: PipelineConfig) -> Result<()> {
    if config.emit_sequences {
        let (translator, commits) = ChannelTranslator::channel();
        run_stdio(Pipeline::new(config, translator), commits).await
    } else {
        // Nothing ever arrives; the sender is dropped right away
        let (_, commits) = mpsc::unbounded_channel();
        run_stdio(Pipeline::new(config, LogTranslator), commits).await
    }
}

async fn run_stdio<T: Translator>(
    pipeline: Pipeline<T>,
    commits: UnboundedReceiver<CommittedSequence>,
) -> Result<()> {
    pipeline.start_sweeper().await?;
    let mut stdout = tokio::io::stdout();
    serve(&pipeline, tokio::io::stdin(), &mut stdout, commits).await
}

/// Answer each input line until the reader closes, then shut the pipeline
/// down and write out every sequence committed along the way.
pub async fn serve<T, R, W>(
    pipeline: &Pipeline<T>,
    reader: R,
    writer: &mut W,
    mut commits: UnboundedReceiver<CommittedSequence>,
) -> Result<()>
where
    T: Translator,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = pump(pipeline, reader, writer, &mut commits).await;
    let shutdown = pipeline.shutdown().await;

    if result.is_ok() {
        while let Ok(sequence) = commits.try_recv() {
            write_message(writer, &Outbound::Sequence(sequence)).await?;
        }
    }

    result.and(shutdown)
}

async fn pump<T, R, W>(
    pipeline: &Pipeline<T>,
    reader: R,
    writer: &mut W,
    commits: &mut UnboundedReceiver<CommittedSequence>,
) -> Result<()>
where
    T: Translator,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input line")? else {
                    log_info!("input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let reply = handle_line(pipeline, &line).await;
                write_message(writer, &reply).await?;
            }
            Some(sequence) = commits.recv() => {
                write_message(writer, &Outbound::Sequence(sequence)).await?;
            }
        }
    }

    Ok(())
}

async fn handle_line<T: Translator>(pipeline: &Pipeline<T>, line: &str) -> Outbound {
    match serde_json::from_str::<Inbound>(line) {
        Ok(Inbound::Frame(frame)) => Outbound::Detection(pipeline.process_frame(frame).await),
        Ok(Inbound::Command(command)) => Outbound::Command(pipeline.handle_command(command)),
        Err(err) => {
            log_warn!("rejected inbound message: {err}");
            Outbound::error(format!("invalid message: {err}"))
        }
    }
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &Outbound) -> Result<()> {
    let mut encoded = serde_json::to_vec(message).context("failed to encode outbound message")?;
    encoded.push(b'\n');
    writer
        .write_all(&encoded)
        .await
        .context("failed to write outbound message")?;
    writer.flush().await.context("failed to flush output")
}
