use crate::config::Config;
use crate::{db, referral, slug};

/// Rounds of allocate-then-insert before giving up when concurrent
/// registrations keep claiming the allocated name first.
const INSERT_ROUNDS: usize = 3;

/// Register a member: derive its referral code, allocate a domain name from
/// `display_name` against the registry, and persist both.
///
/// Allocation alone does not reserve the name, so a UNIQUE conflict on
/// `domain_name` at insert time triggers a fresh allocation.
pub async fn register(
    config: &Config,
    identifier: &str,
    display_name: &str,
) -> anyhow::Result<db::Member> {
    register_with(config, identifier, display_name, |name| async move {
        db::domain_exists(&name)
    })
    .await
}

async fn register_with<F, Fut>(
    config: &Config,
    identifier: &str,
    display_name: &str,
    mut exists: F,
) -> anyhow::Result<db::Member>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    let secret = config.referral_secret()?;
    let referral_code =
        referral::generate_referral_code(identifier, secret.expose(), config.referral_length())?;

    for round in 1..=INSERT_ROUNDS {
        let domain_name =
            slug::allocate(display_name, &mut exists, config.domain_max_tries()).await?;

        match db::create_member(identifier, display_name, &domain_name, &referral_code) {
            Ok(member) => {
                tracing::info!(id = %member.id, domain = %member.domain_name, "member registered");
                return Ok(member);
            }
            Err(e) if db::is_unique_violation(&e, "members.domain_name") => {
                tracing::warn!(domain = %domain_name, round, "domain name claimed concurrently, reallocating");
            }
            Err(e) => return Err(e),
        }
    }

    anyhow::bail!("could not reserve a unique domain name for {display_name:?}")
}
