use std::collections::BTreeMap;

use super::error::WorkloadError;

fn split_user(entry: &str) -> Result<(&str, &str), WorkloadError> {
    entry
        .split_once(':')
        .filter(|(user, password)| !user.is_empty() && !password.is_empty())
        .ok_or_else(|| WorkloadError::BasicAuth(format!("'user:password' 형식이 아님: {}", entry.split(':').next().unwrap_or(""))))
}

/// `user:password` 목록으로 bcrypt htpasswd 파일 내용을 만듭니다.
pub fn generate(users: &[String]) -> Result<String, WorkloadError> {
    let mut out = String::new();
    for entry in users {
        let (user, password) = split_user(entry)?;
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| WorkloadError::BasicAuth(e.to_string()))?;
        out.push_str(&format!("{}:{}\n", user, hash));
    }
    Ok(out)
}

/// 기존 htpasswd가 같은 사용자와 비밀번호를 담고 있는지 확인합니다.
///
/// bcrypt 해시는 매번 솔트가 달라지므로 문자열 비교 대신 검증으로 판단합니다.
pub fn matches(current: &str, users: &[String]) -> Result<bool, WorkloadError> {
    let hashes: BTreeMap<&str, &str> = current
        .lines()
        .filter_map(|line| line.split_once(':'))
        .collect();
    if hashes.len() != users.len() {
        return Ok(false);
    }

    for entry in users {
        let (user, password) = split_user(entry)?;
        let verified = match hashes.get(user) {
            Some(hash) => bcrypt::verify(password, hash).unwrap_or(false),
            None => false,
        };
        if !verified {
            return Ok(false);
        }
    }
    Ok(true)
}
