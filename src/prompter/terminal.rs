use super::Prompter;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, Stdin, Stdout};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::warn;

/// 터미널에서 질문을 출력하고 한 줄씩 응답을 읽는 Prompter 구현이다.
pub struct TerminalPrompter<R = Stdin, W = Stdout> {
    /// 라인 단위 입력 스트림.
    lines: Mutex<FramedRead<R, LinesCodec>>,
    /// 질문을 출력할 대상.
    writer: Mutex<W>,
}

impl TerminalPrompter {
    /// 표준 입출력을 사용하는 Prompter를 생성한다.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> TerminalPrompter<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            lines: Mutex::new(FramedRead::new(reader, LinesCodec::new())),
            writer: Mutex::new(writer),
        }
    }

    /// 질문을 출력하고 한 줄을 읽는다. 입력이 닫히면 오류를 반환한다.
    async fn ask(&self, question: &str) -> anyhow::Result<String> {
        {
            let mut writer = self.writer.lock().await;
            writer.write_all(question.as_bytes()).await?;
            writer.flush().await?;
        }
        let mut lines = self.lines.lock().await;
        match lines.next().await {
            Some(Ok(line)) => Ok(line.trim().to_string()),
            Some(Err(err)) => Err(anyhow::anyhow!("입력 읽기 오류: {err}")),
            None => anyhow::bail!("입력 스트림이 닫혔습니다."),
        }
    }

    async fn notice(&self, text: &str) -> anyhow::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<R, W> Prompter for TerminalPrompter<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, message: &str, default: bool) -> anyhow::Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let line = self.ask(&format!("{message} ({hint}) ")).await?;
            match parse_confirm(&line, default) {
                Some(answer) => return Ok(answer),
                None => {
                    warn!(input = %line, "확인 응답을 해석할 수 없습니다.");
                    self.notice("y 또는 n으로 답해 주세요.\n").await?;
                }
            }
        }
    }

    async fn text(&self, message: &str, default: Option<&str>) -> anyhow::Result<String> {
        let question = match default {
            Some(value) => format!("{message} [{value}] "),
            None => format!("{message} "),
        };
        loop {
            let line = self.ask(&question).await?;
            if !line.is_empty() {
                return Ok(line);
            }
            if let Some(value) = default {
                return Ok(value.to_string());
            }
            self.notice("값을 입력해 주세요.\n").await?;
        }
    }

    async fn select(
        &self,
        message: &str,
        choices: &[String],
        default: Option<usize>,
    ) -> anyhow::Result<usize> {
        if choices.is_empty() {
            anyhow::bail!("선택지가 비어 있습니다: {message}");
        }
        self.notice(&render_choices(message, choices)).await?;
        loop {
            let line = self.ask("번호를 입력하세요: ").await?;
            match parse_select(&line, choices.len(), default) {
                Some(index) => return Ok(index),
                None => {
                    warn!(input = %line, "선택 응답을 해석할 수 없습니다.");
                    self.notice(&format!("1부터 {} 사이의 번호를 입력해 주세요.\n", choices.len()))
                        .await?;
                }
            }
        }
    }

    async fn multi_select(
        &self,
        message: &str,
        choices: &[String],
    ) -> anyhow::Result<Vec<usize>> {
        self.notice(&render_choices(message, choices)).await?;
        loop {
            let line = self.ask("쉼표로 구분한 번호를 입력하세요: ").await?;
            match parse_multi_select(&line, choices.len()) {
                Some(indexes) => return Ok(indexes),
                None => {
                    warn!(input = %line, "다중 선택 응답을 해석할 수 없습니다.");
                    self.notice("번호를 쉼표로 구분해 입력해 주세요.\n").await?;
                }
            }
        }
    }
}

fn render_choices(message: &str, choices: &[String]) -> String {
    let mut out = format!("{message}\n");
    for (i, choice) in choices.iter().enumerate() {
        out.push_str(&format!("  {}. {choice}\n", i + 1));
    }
    out
}

/// 확인 응답을 해석한다. 빈 입력은 기본값을 사용한다.
pub(crate) fn parse_confirm(input: &str, default: bool) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// 1 기반 번호를 0 기반 인덱스로 해석한다.
pub(crate) fn parse_select(input: &str, len: usize, default: Option<usize>) -> Option<usize> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return default.filter(|d| *d < len);
    }
    let number: usize = trimmed.parse().ok()?;
    (1..=len).contains(&number).then(|| number - 1)
}

/// 쉼표로 구분된 1 기반 번호 목록을 해석한다. 빈 입력은 선택 없음이다.
pub(crate) fn parse_multi_select(input: &str, len: usize) -> Option<Vec<usize>> {
    let mut indexes = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let index = parse_select(part, len, None)?;
        if !indexes.contains(&index) {
            indexes.push(index);
        }
    }
    Some(indexes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_parsing_accepts_common_answers() {
        assert_eq!(parse_confirm("", true), Some(true));
        assert_eq!(parse_confirm(" YES ", false), Some(true));
        assert_eq!(parse_confirm("n", true), Some(false));
        assert_eq!(parse_confirm("maybe", true), None);
    }

    #[test]
    fn select_parsing_is_one_based_and_bounded() {
        assert_eq!(parse_select("1", 3, None), Some(0));
        assert_eq!(parse_select("3", 3, None), Some(2));
        assert_eq!(parse_select("4", 3, None), None);
        assert_eq!(parse_select("0", 3, None), None);
        assert_eq!(parse_select("", 3, Some(1)), Some(1));
        assert_eq!(parse_select("", 3, None), None);
    }

    #[test]
    fn multi_select_parsing_deduplicates() {
        assert_eq!(parse_multi_select("1, 3,1", 3), Some(vec![0, 2]));
        assert_eq!(parse_multi_select("", 3), Some(vec![]));
        assert_eq!(parse_multi_select("1,x", 3), None);
    }

    /// 잘못된 입력 후 다시 물어 올바른 응답을 받는지 검증한다.
    #[tokio::test]
    async fn terminal_prompter_reasks_on_invalid_input() {
        let input: &'static [u8] = b"maybe\nn\norders\n2\n";
        let prompter = TerminalPrompter::new(input, tokio::io::sink());
        assert!(!prompter.confirm("delete queue?", true).await.expect("확인 실패"));
        assert_eq!(
            prompter.text("queue name?", None).await.expect("입력 실패"),
            "orders"
        );
        let choices = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            prompter.select("pick", &choices, None).await.expect("선택 실패"),
            1
        );
    }

    #[tokio::test]
    async fn closed_input_is_an_error() {
        let input: &'static [u8] = b"";
        let prompter = TerminalPrompter::new(input, tokio::io::sink());
        assert!(prompter.confirm("continue?", true).await.is_err());
    }
}
