pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# LOGSHIP CONFIGURATION
# =============================================================================
# Logship tails local log sources, cleans and redacts each line, folds stack
# traces into single records and forwards them to an HTTP collector.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/logship/config.yml
#   3. /etc/logship/config.yml
#
# Any value may reference an environment variable by writing $env followed by
# the variable name in braces, as the api_key below does. The variables
# LOGSHIP_ENDPOINT, LOGSHIP_API_KEY, LOGSHIP_API_SECRET and
# LOGSHIP_IGNORED_SOURCES (comma separated) override the file when set.

# =============================================================================
# SENDER
# =============================================================================
sender:
  endpoint: https://collector.example.com/api/logs
  api_key: $env{LOGSHIP_API_KEY}
  api_secret: $env{LOGSHIP_API_SECRET}
  # Per-request timeout
  timeout: 15s

# =============================================================================
# PIPELINE
# =============================================================================
pipeline:
  # Identical messages (ignoring case, whitespace and timestamps) are
  # forwarded at most once per window
  dedup_ttl: 15s
  # Minimum time between sweeps of expired dedup entries (0s sweeps on
  # every line)
  dedup_sweep_interval: 0s
  # Pending chunks per source before backpressure applies
  queue_capacity: 1024
  # 'block' waits for the source queue, 'drop' discards chunks when it is full
  backpressure: block

# =============================================================================
# SOURCES
# =============================================================================
sources:
  files:
    app:
      path: /var/log/app/app.log
      # Where to start reading: 'beginning' or 'end'
      start: end
      # Keep watching for new lines after EOF
      follow: true

  journald:
    enabled: false
    # Leave empty to follow the whole journal
    units: []

  # Source ids that are never forwarded (file ids or journal identifiers)
  ignored: []

# =============================================================================
# LABELS
# =============================================================================
# Added to every entry. Labels produced by a source win on conflict.
labels:
  environment: production
"#
    .to_string()
}
