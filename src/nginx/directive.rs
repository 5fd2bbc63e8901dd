use std::fmt;

const INDENT: &str = "    ";

/// Nginx 설정 언어의 디렉티브 하나를 표현합니다.
///
/// `block`이 `Some`이면 `{ ... }` 블록 디렉티브, `None`이면 `;`로 끝나는
/// 단순 디렉티브로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
    pub block: Option<Vec<Directive>>,
}

impl Directive {
    pub fn new<N, I, A>(name: N, args: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
            block: None,
        }
    }

    pub fn block<N, I, A>(name: N, args: I, children: Vec<Directive>) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            block: Some(children),
            ..Self::new(name, args)
        }
    }

    /// 인자가 없는 블록 디렉티브 (`events`, `http`, `server` 등)
    pub fn section<N: Into<String>>(name: N, children: Vec<Directive>) -> Self {
        Self::block(name, Vec::<String>::new(), children)
    }

    /// 자식 디렉티브 중 이름이 일치하는 첫 번째 항목을 찾습니다.
    pub fn find(&self, name: &str) -> Option<&Directive> {
        self.block.as_ref()?.iter().find(|d| d.name == name)
    }

    fn write_to(&self, out: &mut String, depth: usize) {
        let indent = INDENT.repeat(depth);
        out.push_str(&indent);
        out.push_str(&quote(&self.name));
        for arg in &self.args {
            out.push(' ');
            out.push_str(&quote(arg));
        }

        match &self.block {
            Some(children) => {
                out.push_str(" {\n");
                for child in children {
                    child.write_to(out, depth + 1);
                }
                out.push_str(&indent);
                out.push_str("}\n");
            }
            None => out.push_str(";\n"),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_to(&mut out, 0);
        f.write_str(&out)
    }
}

/// 디렉티브 목록을 설정 파일 텍스트로 직렬화합니다.
pub fn render(directives: &[Directive]) -> String {
    let mut out = String::new();
    for directive in directives {
        directive.write_to(&mut out, 0);
    }
    out
}

fn needs_quotes(token: &str) -> bool {
    token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ';' | '{' | '}' | '#' | '"' | '\''))
}

fn quote(token: &str) -> String {
    if !needs_quotes(token) {
        return token.to_string();
    }

    // 큰따옴표만 포함한 경우 작은따옴표로 감싸면 이스케이프가 필요 없음
    if token.contains('"') && !token.contains('\'') {
        return format!("'{}'", token);
    }

    let escaped = token.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
