use std::cmp::Reverse;

use crate::jobs::paths::PathScheme;

/// Keep backup names and order them newest first by their embedded instant.
///
/// Names whose instant cannot be read sort after all readable ones. Ties
/// keep directory order, which is itself unspecified.
pub fn newest_first<I>(scheme: &PathScheme, names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut backups: Vec<_> = names
        .into_iter()
        .filter(|name| name.starts_with(scheme.backup_prefix()))
        .map(|name| (scheme.backup_instant(&name), name))
        .collect();
    backups.sort_by_key(|(instant, _)| Reverse(*instant));
    backups.into_iter().map(|(_, name)| name).collect()
}
